//! Permission administration and checks

use crate::app::AppState;
use crate::error::{ServerError, ServerResult};
use crate::request::Request;
use crate::response::Response;
use lodestar_auth::{Action, Context, ContextUpdate, GroupNode, UserPermissionList};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct LabelBody {
	label: String,
}

#[derive(Debug, Deserialize)]
struct LocatorBody {
	#[serde(default)]
	locator: String,
}

#[derive(Debug, Deserialize)]
struct CheckQuery {
	action: String,
	uri: String,
	user: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ContextDetail {
	context: Context,
	actions: Vec<Action>,
	groups: Vec<GroupNode>,
	users: UserPermissionList,
}

pub async fn list_actions(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	state.require_superuser(&request).await?;
	let realm = state.realm(request.param("realm")?)?;
	let actions = state.checker.permissions().get_actions(realm).await?;
	Response::ok().with_json(&actions)
}

pub async fn create_action(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	state.require_superuser(&request).await?;
	let realm = state.realm(request.param("realm")?)?;
	let body: LabelBody = request.json()?;
	if !state.checker.permissions().create_action(realm, &body.label).await? {
		return Err(ServerError::Conflict(format!("action '{}' already exists", body.label)));
	}
	Response::created().with_json(&json!({ "label": body.label }))
}

pub async fn update_action(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	state.require_superuser(&request).await?;
	let realm = state.realm(request.param("realm")?)?;
	let action_id = request.param_i64("id")?;
	let body: LabelBody = request.json()?;
	if body.label.is_empty() {
		return Err(ServerError::BadRequest("label must not be empty".to_string()));
	}
	if !state.checker.permissions().save_action(realm, action_id, &body.label).await? {
		return Err(ServerError::NotFound(format!("action {action_id}")));
	}
	let action = state.checker.permissions().get_action(realm, action_id).await?;
	Response::ok().with_json(&action)
}

pub async fn list_contexts(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	state.require_superuser(&request).await?;
	let realm = state.realm(request.param("realm")?)?;
	let contexts = state.checker.permissions().get_contexts(realm).await?;
	Response::ok().with_json(&contexts)
}

pub async fn create_context(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	state.require_superuser(&request).await?;
	let realm = state.realm(request.param("realm")?)?;
	let body: LocatorBody = request.json()?;
	if !state.checker.permissions().create_context(realm, &body.locator).await? {
		return Err(ServerError::Conflict(format!("context '{}' already exists", body.locator)));
	}
	Response::created().with_json(&json!({ "locator": body.locator }))
}

/// A context with the group tree and user list an editor needs
pub async fn context_detail(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	state.require_superuser(&request).await?;
	let realm = state.realm(request.param("realm")?)?;
	let context_id = request.param_i64("id")?;
	let permissions = state.checker.permissions();

	let Some(context) = permissions.get_context(context_id, realm).await? else {
		return Err(ServerError::NotFound(format!("context {context_id}")));
	};
	let action_set = permissions.get_action_names(realm).await?;
	let detail = ContextDetail {
		context,
		actions: permissions.get_actions(realm).await?,
		groups: permissions.build_group_tree(realm, context_id, &action_set).await?,
		users: permissions.build_user_list(realm, context_id, &action_set).await?,
	};
	Response::ok().with_json(&detail)
}

pub async fn save_context(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	let user_id = state.require_superuser(&request).await?;
	let realm = state.realm(request.param("realm")?)?;
	let context_id = request.param_i64("id")?;
	let update: ContextUpdate = request.json()?;

	state
		.checker
		.permissions()
		.save_context(realm, context_id, &update)
		.await?;
	tracing::info!(realm, context_id, user_id, "permission context saved");
	Response::ok().with_json(&json!({ "saved": true }))
}

pub async fn check(state: Arc<AppState>, request: Request) -> ServerResult<Response> {
	let realm = state.realm(request.param("realm")?)?;
	let query: CheckQuery = request.query()?;
	let allowed = state
		.checker
		.can(&query.action, &query.uri, realm, query.user)
		.await?;
	Response::ok().with_json(&json!({ "allowed": allowed }))
}
