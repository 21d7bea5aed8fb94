//! Database errors

/// Errors raised while connecting or migrating
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Migration {name} failed: {source}")]
	Migration {
		name: String,
		#[source]
		source: sqlx::Error,
	},

	#[error("Invalid database URL '{0}'")]
	InvalidUrl(String),
}

pub type DbResult<T> = Result<T, DbError>;
