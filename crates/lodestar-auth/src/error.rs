//! Error types for accounts and permissions

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error(transparent)]
	Db(#[from] lodestar_db::DbError),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Already exists: {0}")]
	Duplicate(String),

	#[error("Invalid group hierarchy: {0}")]
	InvalidHierarchy(String),

	#[error("Validation error: {0}")]
	Validation(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
	matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
