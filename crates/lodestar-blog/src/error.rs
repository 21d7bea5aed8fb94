//! Blog errors

use lodestar_utils::UtilsError;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BlogError {
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error(transparent)]
	Db(#[from] lodestar_db::DbError),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Validation error: {0}")]
	Validation(String),

	#[error("Cache error: {0}")]
	Cache(#[from] UtilsError),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

pub type BlogResult<T> = Result<T, BlogError>;
