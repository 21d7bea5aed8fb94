//! Embedded schema migrations
//!
//! Migrations are applied in order, each inside its own transaction, and
//! recorded in `lodestar_migrations` so reruns skip them.

use crate::connection::DatabaseConnection;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};

/// One schema step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
	pub name: &'static str,
	pub sql: &'static str,
}

/// Every migration, in application order
pub static MIGRATIONS: &[Migration] = &[
	Migration {
		name: "0001_accounts",
		sql: include_str!("../migrations/0001_accounts.sql"),
	},
	Migration {
		name: "0002_permissions",
		sql: include_str!("../migrations/0002_permissions.sql"),
	},
	Migration {
		name: "0003_blog",
		sql: include_str!("../migrations/0003_blog.sql"),
	},
	Migration {
		name: "0004_pages",
		sql: include_str!("../migrations/0004_pages.sql"),
	},
];

/// Migration record
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MigrationRecord {
	pub name: String,
	pub applied: DateTime<Utc>,
}

/// Applies [`MIGRATIONS`] against a connection
pub struct MigrationExecutor {
	connection: DatabaseConnection,
}

impl MigrationExecutor {
	pub fn new(connection: DatabaseConnection) -> Self {
		Self { connection }
	}

	pub async fn ensure_schema_table(&self) -> DbResult<()> {
		sqlx::query(
			"CREATE TABLE IF NOT EXISTS lodestar_migrations (
				name TEXT PRIMARY KEY,
				applied TEXT NOT NULL
			)",
		)
		.execute(self.connection.pool())
		.await?;
		Ok(())
	}

	/// Migrations recorded as applied, oldest first
	pub async fn applied(&self) -> DbResult<Vec<MigrationRecord>> {
		self.ensure_schema_table().await?;
		let records = sqlx::query_as::<_, MigrationRecord>(
			"SELECT name, applied FROM lodestar_migrations ORDER BY name",
		)
		.fetch_all(self.connection.pool())
		.await?;
		Ok(records)
	}

	/// Names of migrations not applied yet
	pub async fn pending(&self) -> DbResult<Vec<&'static str>> {
		let applied = self.applied().await?;
		Ok(MIGRATIONS
			.iter()
			.filter(|m| !applied.iter().any(|r| r.name == m.name))
			.map(|m| m.name)
			.collect())
	}

	/// Apply every pending migration and return the names applied
	pub async fn apply_all(&self) -> DbResult<Vec<&'static str>> {
		let pending = self.pending().await?;
		let mut done = Vec::with_capacity(pending.len());

		for migration in MIGRATIONS.iter().filter(|m| pending.contains(&m.name)) {
			let mut tx = self.connection.begin().await?;
			sqlx::raw_sql(migration.sql)
				.execute(&mut *tx)
				.await
				.map_err(|source| DbError::Migration {
					name: migration.name.to_string(),
					source,
				})?;
			sqlx::query("INSERT INTO lodestar_migrations (name, applied) VALUES (?, ?)")
				.bind(migration.name)
				.bind(Utc::now())
				.execute(&mut *tx)
				.await?;
			tx.commit().await?;

			tracing::info!(migration = migration.name, "applied migration");
			done.push(migration.name);
		}

		Ok(done)
	}
}
