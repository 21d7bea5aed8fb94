//! Blog listing and authoring

use crate::app::AppState;
use crate::error::{ServerError, ServerResult};
use crate::request::Request;
use crate::response::Response;
use crate::views::Paging;
use lodestar_blog::{NewPost, Post, PostScope, PostVersion, TagSort};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const BLOG_URI: &str = "/blog";
const TAGS_URI: &str = "/blog/tags";

#[derive(Debug, Deserialize)]
struct CreatePostBody {
	#[serde(flatten)]
	post: NewPost,
	#[serde(default)]
	publish: bool,
}

#[derive(Debug, Default, Deserialize)]
struct TagQuery {
	offset: Option<i64>,
	limit: Option<i64>,
	sort: Option<TagSort>,
	desc: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TagBody {
	name: String,
}

#[derive(Debug, Serialize)]
struct PostDetail {
	post: Post,
	latest: Option<PostVersion>,
	tags: Vec<i64>,
}

impl AppState {
	async fn can_blog(&self, label: &str, uri: &str, request: &Request) -> ServerResult<bool> {
		Ok(self
			.checker
			.can(label, uri, &self.admin_realm, request.user_id())
			.await?)
	}

	/// Whether the request's user owns `author_id` or is a superuser
	async fn owns_author(&self, request: &Request, author_id: i64) -> ServerResult<bool> {
		let Some(user_id) = request.user_id() else {
			return Ok(false);
		};
		if self.is_superuser(request).await? {
			return Ok(true);
		}
		let authors = self.blog.authors_for_user(user_id).await?;
		Ok(authors.iter().any(|a| a.id == author_id))
	}
}

/// Superusers see every post, other users published posts plus their own
pub async fn list_posts(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	let paging: Paging = request.query()?;
	let scope = match request.user_id() {
		Some(_) if state.is_superuser(&request).await? => PostScope::All,
		Some(user_id) => PostScope::VisibleTo(user_id),
		None => PostScope::Published,
	};
	let posts = state
		.blog
		.list_posts(scope, paging.offset(), paging.limit())
		.await?;
	Response::ok().with_json(&posts)
}

pub async fn create_post(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	if !state.can_blog("create", BLOG_URI, &request).await? {
		return Err(ServerError::Forbidden("may not create blog posts".to_string()));
	}
	let body: CreatePostBody = request.json()?;
	if !state.owns_author(&request, body.post.author).await? {
		return Err(ServerError::Forbidden(format!(
			"may not post as author {}",
			body.post.author
		)));
	}

	let publish = body.publish && state.can_blog("publish", BLOG_URI, &request).await?;
	if body.publish && !publish {
		tracing::info!(user_id = ?request.user_id(), "publish permission missing, saving as draft");
	}
	let post_id = state
		.blog
		.create_post(&body.post, publish, request.user_id())
		.await?;
	if publish {
		state.blog.clear_blog_cache().await?;
	}

	let post = state.blog.get_post(post_id).await?;
	Response::created().with_json(&post)
}

pub async fn get_post(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	let post_id = request.param_i64("id")?;
	let Some(post) = state.blog.get_post(post_id).await? else {
		return Err(ServerError::NotFound(format!("post {post_id}")));
	};
	if !post.status && !state.owns_author(&request, post.author).await? {
		return Err(ServerError::NotFound(format!("post {post_id}")));
	}
	let detail = PostDetail {
		latest: state.blog.latest_version(post.id).await?,
		tags: state.blog.tags_for_post(post.id).await?,
		post,
	};
	Response::ok().with_json(&detail)
}

pub async fn list_tags(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	let query: TagQuery = request.query()?;
	let paging = Paging {
		offset: query.offset,
		limit: query.limit,
	};
	let tags = state
		.blog
		.list_tags(
			paging.offset(),
			paging.limit(),
			query.sort.unwrap_or_default(),
			query.desc.unwrap_or(false),
		)
		.await?;
	Response::ok().with_json(&tags)
}

pub async fn create_tag(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	if !state.can_blog("create", TAGS_URI, &request).await? {
		return Err(ServerError::Forbidden("may not create tags".to_string()));
	}
	let body: TagBody = request.json()?;
	let tag = state.blog.create_tag(&body.name).await?;
	Response::created().with_json(&tag)
}
