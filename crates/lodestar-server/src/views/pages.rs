//! Custom page trees and public page serving

use crate::app::AppState;
use crate::error::ServerResult;
use crate::request::Request;
use crate::response::Response;
use lodestar_pages::Served;
use std::sync::Arc;

pub async fn dir_tree(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	state.require_superuser(&request).await?;
	let realm = state.realm(request.param("realm")?)?;
	let tree = state
		.pages
		.custom_dir_children(realm, None, None)
		.await?;
	Response::ok().with_json(&tree)
}

/// Fallback for everything else: a public custom page or its redirect
pub async fn serve_page(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	let path = request.param("path")?;
	match state.pages.serve(&state.public_realm, path).await? {
		Served::Page { html, .. } => Ok(Response::ok().with_html(html)),
		Served::Redirect(redirect) => {
			let location = if redirect.same_realm {
				format!("/{}", redirect.newpath)
			} else {
				redirect.newpath
			};
			match Response::moved_permanently(&location) {
				Ok(response) => Ok(response),
				Err(e) => {
					tracing::warn!(redirect_id = redirect.id, location = %location, error = %e, "stored redirect target is not a valid location");
					Ok(not_found())
				}
			}
		}
		Served::NotFound => Ok(not_found()),
	}
}

fn not_found() -> Response {
	Response::not_found().with_html("<h1>Not Found</h1>")
}
