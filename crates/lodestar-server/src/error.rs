//! Request errors and their HTTP status codes

use crate::response::Response;
use http::StatusCode;
use lodestar_auth::AuthError;
use lodestar_blog::BlogError;
use lodestar_pages::PageError;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error(transparent)]
	Auth(#[from] AuthError),

	#[error(transparent)]
	Blog(#[from] BlogError),

	#[error(transparent)]
	Pages(#[from] PageError),

	#[error("Bad request: {0}")]
	BadRequest(String),

	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Method not allowed")]
	MethodNotAllowed,

	#[error("Request body exceeds {limit} bytes")]
	PayloadTooLarge { limit: usize },

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("HTTP error: {0}")]
	Http(#[from] http::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Auth(AuthError::NotFound(_)) => StatusCode::NOT_FOUND,
			Self::Auth(AuthError::Duplicate(_) | AuthError::InvalidHierarchy(_)) => {
				StatusCode::CONFLICT
			}
			Self::Auth(AuthError::Validation(_)) => StatusCode::BAD_REQUEST,
			Self::Blog(BlogError::NotFound(_)) => StatusCode::NOT_FOUND,
			Self::Blog(BlogError::Validation(_)) => StatusCode::BAD_REQUEST,
			Self::Pages(PageError::NotFound(_)) => StatusCode::NOT_FOUND,
			Self::Pages(PageError::Collision(_)) => StatusCode::CONFLICT,
			Self::Pages(PageError::Validation(_)) => StatusCode::BAD_REQUEST,
			Self::BadRequest(_) => StatusCode::BAD_REQUEST,
			Self::Forbidden(_) => StatusCode::FORBIDDEN,
			Self::NotFound(_) => StatusCode::NOT_FOUND,
			Self::Conflict(_) => StatusCode::CONFLICT,
			Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
			Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// JSON error body; server faults are logged and not described
	pub fn into_response(self) -> Response {
		let status = self.status();
		let message = if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
			"internal server error".to_string()
		} else {
			self.to_string()
		};
		let body = serde_json::json!({ "error": message });
		Response::new(status).with_json_value(&body)
	}
}
