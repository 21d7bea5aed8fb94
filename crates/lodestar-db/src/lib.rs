//! # Lodestar DB
//!
//! SQLite connection handling and the embedded schema for Lodestar.
//!
//! Every other crate talks to the database through a [`DatabaseConnection`]
//! and expects [`MigrationExecutor::apply_all`] to have run first.
//!
//! ```rust,no_run
//! use lodestar_db::{DatabaseConnection, MigrationExecutor};
//!
//! # async fn example() -> lodestar_db::DbResult<()> {
//! let db = DatabaseConnection::connect("sqlite::memory:", 1).await?;
//! MigrationExecutor::new(db.clone()).apply_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod migrations;

pub use connection::DatabaseConnection;
pub use error::{DbError, DbResult};
pub use migrations::{MIGRATIONS, Migration, MigrationExecutor, MigrationRecord};

/// Re-exported so dependants share one sqlx version
pub use sqlx;
