//! The permission engine
//!
//! [`tree`] holds the pure tree and list builders; [`PermissionStore`] loads
//! their inputs from the database and persists actions, contexts and rules.

pub mod store;
pub mod tree;

pub use store::PermissionStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recursion bound for group hierarchies
pub const MAX_RECURSE_DEPTH: usize = 100;

/// Action id to label: the actions in scope for an evaluation
pub type ActionSet = BTreeMap<i64, String>;

/// Label to granted flag
pub type PermissionMap = BTreeMap<String, bool>;

/// User id to that user's permission map
pub type UserPermissionList = BTreeMap<i64, PermissionMap>;

/// A named action within a realm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Action {
	pub id: i64,
	pub realm: String,
	pub label: String,
}

/// A realm-scoped path locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Context {
	pub id: i64,
	pub realm: String,
	pub locator: String,
}

/// One group in a permission tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
	pub group_id: i64,
	pub name: String,
	pub superuser: bool,
	/// Labels granted to this group itself
	pub perms: PermissionMap,
	/// Labels granted to this group or any ancestor
	pub inherit: PermissionMap,
	pub children: Vec<GroupNode>,
}

/// Desired complete state of one context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUpdate {
	pub locator: String,
	#[serde(default)]
	pub group_perms: BTreeMap<i64, PermissionMap>,
	#[serde(default)]
	pub user_perms: BTreeMap<i64, PermissionMap>,
}
