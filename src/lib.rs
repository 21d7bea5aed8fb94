//! # Lodestar
//!
//! A content-management backend: a blog engine, custom pages organised in
//! per-realm directory trees, and a hierarchical permission engine that
//! decides which users may perform which actions on which paths.
//!
//! This crate re-exports the member crates under short module names.
//!
//! ## Feature Flags
//!
//! - `blog` - blog engine ([`blog`])
//! - `pages` - custom pages ([`pages`])
//! - `server` - HTTP server and JSON views ([`server`]), implies `blog` and `pages`
//! - `full` (default) - everything
//!
//! Settings ([`conf`]), storage ([`db`]), utilities ([`utils`]) and the
//! permission engine ([`auth`]) are always available.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use lodestar::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load(None)?;
//! let db = DatabaseConnection::connect(&settings.database.url, settings.database.max_connections).await?;
//! MigrationExecutor::new(db.clone()).apply_all().await?;
//!
//! let checker = PermissionChecker::new(db);
//! let allowed = checker.can("create", "/blog", &settings.admin_realm, Some(1)).await?;
//! println!("user 1 may create posts: {allowed}");
//! # Ok(())
//! # }
//! ```

pub use lodestar_auth as auth;
pub use lodestar_conf as conf;
pub use lodestar_db as db;
pub use lodestar_utils as utils;

#[cfg(feature = "blog")]
pub use lodestar_blog as blog;
#[cfg(feature = "pages")]
pub use lodestar_pages as pages;
#[cfg(feature = "server")]
pub use lodestar_server as server;

/// The types most applications touch
pub mod prelude {
	pub use lodestar_auth::{AccountStore, PermissionChecker, PermissionStore};
	pub use lodestar_conf::Settings;
	pub use lodestar_db::{DatabaseConnection, MigrationExecutor};
	pub use lodestar_utils::{FileCache, KeyRing};

	#[cfg(feature = "blog")]
	pub use lodestar_blog::BlogStore;
	#[cfg(feature = "pages")]
	pub use lodestar_pages::PageStore;
	#[cfg(feature = "server")]
	pub use lodestar_server::{AppState, HttpServer, build_router};
}
