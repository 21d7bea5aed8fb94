//! Application state and the route table

use crate::error::{ServerError, ServerResult};
use crate::handler::with_state;
use crate::request::Request;
use crate::router::Router;
use crate::views::{blog, pages, permissions};
use lodestar_auth::PermissionChecker;
use lodestar_blog::BlogStore;
use lodestar_conf::Settings;
use lodestar_db::DatabaseConnection;
use lodestar_pages::PageStore;
use lodestar_utils::FileCache;
use std::sync::Arc;

/// Everything views need, shared across requests
#[derive(Debug, Clone)]
pub struct AppState {
	pub checker: PermissionChecker,
	pub blog: BlogStore,
	pub pages: PageStore,
	pub realms: Vec<String>,
	pub public_realm: String,
	pub admin_realm: String,
}

impl AppState {
	pub fn new(db: DatabaseConnection, settings: &Settings, cache: Option<FileCache>) -> Self {
		let mut blog = BlogStore::new(db.clone());
		let mut pages = PageStore::new(db.clone());
		if let Some(cache) = cache {
			blog = blog.with_cache(cache.clone());
			pages = pages.with_cache(cache);
		}
		Self {
			checker: PermissionChecker::new(db),
			blog,
			pages,
			realms: settings.realms.clone(),
			public_realm: settings.public_realm.clone(),
			admin_realm: settings.admin_realm.clone(),
		}
	}

	/// A configured realm named by the request
	pub fn realm<'a>(&self, name: &'a str) -> ServerResult<&'a str> {
		if self.realms.iter().any(|r| r == name) {
			Ok(name)
		} else {
			Err(ServerError::NotFound(format!("realm '{name}'")))
		}
	}

	pub async fn is_superuser(&self, request: &Request) -> ServerResult<bool> {
		match request.user_id() {
			Some(user_id) => Ok(self.checker.accounts().is_superuser(user_id).await?),
			None => Ok(false),
		}
	}

	/// The acting user id, provided they are a superuser
	pub async fn require_superuser(&self, request: &Request) -> ServerResult<i64> {
		match request.user_id() {
			Some(user_id) if self.is_superuser(request).await? => Ok(user_id),
			_ => Err(ServerError::Forbidden("superuser access required".to_string())),
		}
	}
}

/// Every route the site answers
pub fn build_router(state: Arc<AppState>) -> Router {
	let s = || state.clone();
	Router::new()
		.get("/api/permissions/{realm}/actions", with_state(s(), permissions::list_actions))
		.post("/api/permissions/{realm}/actions", with_state(s(), permissions::create_action))
		.put("/api/permissions/{realm}/actions/{id}", with_state(s(), permissions::update_action))
		.get("/api/permissions/{realm}/contexts", with_state(s(), permissions::list_contexts))
		.post("/api/permissions/{realm}/contexts", with_state(s(), permissions::create_context))
		.get("/api/permissions/{realm}/contexts/{id}", with_state(s(), permissions::context_detail))
		.put("/api/permissions/{realm}/contexts/{id}", with_state(s(), permissions::save_context))
		.get("/api/permissions/{realm}/check", with_state(s(), permissions::check))
		.get("/api/blog/posts", with_state(s(), blog::list_posts))
		.post("/api/blog/posts", with_state(s(), blog::create_post))
		.get("/api/blog/posts/{id}", with_state(s(), blog::get_post))
		.get("/api/blog/tags", with_state(s(), blog::list_tags))
		.post("/api/blog/tags", with_state(s(), blog::create_tag))
		.get("/api/pages/{realm}/tree", with_state(s(), pages::dir_tree))
		.get("/{path..}", with_state(s(), pages::serve_page))
}
