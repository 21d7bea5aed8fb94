//! Pooled SQLite connections

use crate::error::{DbError, DbResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;

/// Shared handle to the site database
///
/// Cloning is cheap; every clone uses the same pool.
#[derive(Clone, Debug)]
pub struct DatabaseConnection {
	pool: SqlitePool,
}

impl DatabaseConnection {
	/// Open a pool for `url`
	///
	/// In-memory databases exist per connection, so they are pinned to a
	/// single connection that is never recycled.
	pub async fn connect(url: &str, max_connections: u32) -> DbResult<Self> {
		let options = SqliteConnectOptions::from_str(url)
			.map_err(|_| DbError::InvalidUrl(url.to_string()))?
			.create_if_missing(true)
			.foreign_keys(true);

		let pool_options = if is_memory_url(url) {
			SqlitePoolOptions::new()
				.max_connections(1)
				.min_connections(1)
				.idle_timeout(None::<Duration>)
				.max_lifetime(None::<Duration>)
		} else {
			SqlitePoolOptions::new().max_connections(max_connections.max(1))
		};

		let pool = pool_options.connect_with(options).await?;
		tracing::debug!(url = %url, "database pool opened");
		Ok(Self { pool })
	}

	/// Wrap an existing pool
	pub fn from_pool(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Start a transaction
	///
	/// Queries issued while it is open must go through the transaction,
	/// not the pool.
	pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
		Ok(self.pool.begin().await?)
	}

	pub async fn close(&self) {
		self.pool.close().await;
	}
}

fn is_memory_url(url: &str) -> bool {
	url.contains(":memory:") || url.contains("mode=memory")
}
