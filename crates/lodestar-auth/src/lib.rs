//! # Lodestar Auth
//!
//! User accounts, inheriting groups and the permission engine.
//!
//! A rule grants one action, inside one context, to either a group or a
//! user. Contexts are realm-scoped locators (regular expressions anchored at
//! the start of the request path). Groups inherit every grant of their
//! ancestors.
//!
//! ```rust,no_run
//! use lodestar_auth::{AccountStore, PermissionChecker, PermissionStore};
//! use lodestar_db::{DatabaseConnection, MigrationExecutor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect("sqlite::memory:", 1).await?;
//! MigrationExecutor::new(db.clone()).apply_all().await?;
//!
//! let accounts = AccountStore::new(db.clone());
//! let perms = PermissionStore::new(db.clone());
//! let editors = accounts.create_group("Editors", None, false).await?;
//! let alice = accounts.create_user("alice", None, false).await?;
//! accounts.add_user_to_group(alice.id, editors.id).await?;
//!
//! perms.create_action("admin", "publish").await?;
//! perms.create_context("admin", "/blog").await?;
//!
//! let checker = PermissionChecker::new(db);
//! assert!(!checker.can("publish", "/blog/post/1", "admin", Some(alice.id)).await?);
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod checker;
pub mod error;
pub mod permissions;

pub use accounts::{AccountStore, Group, User};
pub use checker::PermissionChecker;
pub use error::{AuthError, AuthResult};
pub use permissions::{
	Action, ActionSet, Context, ContextUpdate, GroupNode, MAX_RECURSE_DEPTH, PermissionMap,
	PermissionStore, UserPermissionList,
};
