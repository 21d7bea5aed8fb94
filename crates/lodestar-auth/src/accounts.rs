//! Users and inheriting groups

use crate::error::{AuthError, AuthResult, is_unique_violation};
use crate::permissions::MAX_RECURSE_DEPTH;
use chrono::{DateTime, Utc};
use lodestar_db::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A site account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
	pub id: i64,
	pub username: String,
	pub display_name: Option<String>,
	pub superuser: bool,
	pub created: DateTime<Utc>,
}

impl User {
	/// Display name, falling back to the username
	pub fn name(&self) -> &str {
		self.display_name.as_deref().unwrap_or(&self.username)
	}
}

/// A group; `inherits` points at its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
	pub id: i64,
	pub name: String,
	pub inherits: Option<i64>,
	pub superuser: bool,
}

const USER_COLUMNS: &str = "userid AS id, username, display_name, superuser, created";
const GROUP_COLUMNS: &str = "groupid AS id, name, inherits, superuser";

/// Database access for users, groups and memberships
#[derive(Debug, Clone)]
pub struct AccountStore {
	db: DatabaseConnection,
}

impl AccountStore {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	pub async fn create_user(
		&self,
		username: &str,
		display_name: Option<&str>,
		superuser: bool,
	) -> AuthResult<User> {
		if username.trim().is_empty() {
			return Err(AuthError::Validation("username must not be empty".to_string()));
		}

		let result = sqlx::query(
			"INSERT INTO users (username, display_name, superuser, created) VALUES (?, ?, ?, ?)",
		)
		.bind(username)
		.bind(display_name)
		.bind(superuser)
		.bind(Utc::now())
		.execute(self.db.pool())
		.await
		.map_err(|e| {
			if is_unique_violation(&e) {
				AuthError::Duplicate(format!("user '{username}'"))
			} else {
				AuthError::Database(e)
			}
		})?;

		let id = result.last_insert_rowid();
		tracing::info!(user_id = id, username, "user created");
		self.get_user(id)
			.await?
			.ok_or_else(|| AuthError::NotFound(format!("user {id}")))
	}

	pub async fn get_user(&self, user_id: i64) -> AuthResult<Option<User>> {
		let user = sqlx::query_as::<_, User>(&format!(
			"SELECT {USER_COLUMNS} FROM users WHERE userid = ?"
		))
		.bind(user_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(user)
	}

	pub async fn list_users(&self) -> AuthResult<Vec<User>> {
		let users = sqlx::query_as::<_, User>(&format!(
			"SELECT {USER_COLUMNS} FROM users ORDER BY userid"
		))
		.fetch_all(self.db.pool())
		.await?;
		Ok(users)
	}

	/// Create a group, optionally inheriting from an existing one
	pub async fn create_group(
		&self,
		name: &str,
		inherits: Option<i64>,
		superuser: bool,
	) -> AuthResult<Group> {
		if let Some(parent) = inherits
			&& self.get_group(parent).await?.is_none()
		{
			return Err(AuthError::NotFound(format!("group {parent}")));
		}

		let result =
			sqlx::query("INSERT INTO groups (name, inherits, superuser) VALUES (?, ?, ?)")
				.bind(name)
				.bind(inherits)
				.bind(superuser)
				.execute(self.db.pool())
				.await?;

		Ok(Group {
			id: result.last_insert_rowid(),
			name: name.to_string(),
			inherits,
			superuser,
		})
	}

	pub async fn get_group(&self, group_id: i64) -> AuthResult<Option<Group>> {
		let group = sqlx::query_as::<_, Group>(&format!(
			"SELECT {GROUP_COLUMNS} FROM groups WHERE groupid = ?"
		))
		.bind(group_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(group)
	}

	/// Every group, ordered by id
	pub async fn list_groups(&self) -> AuthResult<Vec<Group>> {
		let groups = sqlx::query_as::<_, Group>(&format!(
			"SELECT {GROUP_COLUMNS} FROM groups ORDER BY groupid"
		))
		.fetch_all(self.db.pool())
		.await?;
		Ok(groups)
	}

	/// Re-parent a group
	///
	/// A group may not inherit from itself or from any of its descendants.
	pub async fn set_group_parent(&self, group_id: i64, parent: Option<i64>) -> AuthResult<()> {
		if self.get_group(group_id).await?.is_none() {
			return Err(AuthError::NotFound(format!("group {group_id}")));
		}
		if let Some(parent_id) = parent {
			if parent_id == group_id {
				return Err(AuthError::InvalidHierarchy(format!(
					"group {group_id} cannot inherit from itself"
				)));
			}
			if self.get_group(parent_id).await?.is_none() {
				return Err(AuthError::NotFound(format!("group {parent_id}")));
			}
			if self.group_descends_from(parent_id, group_id).await? {
				return Err(AuthError::InvalidHierarchy(format!(
					"group {parent_id} descends from group {group_id}"
				)));
			}
		}

		sqlx::query("UPDATE groups SET inherits = ? WHERE groupid = ?")
			.bind(parent)
			.bind(group_id)
			.execute(self.db.pool())
			.await?;
		Ok(())
	}

	/// Whether `ancestor` appears anywhere above `group_id`
	pub async fn group_descends_from(&self, group_id: i64, ancestor: i64) -> AuthResult<bool> {
		Ok(self.group_ancestors(group_id).await?.contains(&ancestor))
	}

	/// Ancestors of a group, nearest first
	pub async fn group_ancestors(&self, group_id: i64) -> AuthResult<Vec<i64>> {
		let groups = self.list_groups().await?;
		let parents: HashMap<i64, Option<i64>> =
			groups.iter().map(|g| (g.id, g.inherits)).collect();
		Ok(ancestors_of(&parents, group_id))
	}

	/// Add a membership; returns false if it already existed
	pub async fn add_user_to_group(&self, user_id: i64, group_id: i64) -> AuthResult<bool> {
		let result = sqlx::query("INSERT OR IGNORE INTO user_groups (userid, groupid) VALUES (?, ?)")
			.bind(user_id)
			.bind(group_id)
			.execute(self.db.pool())
			.await?;
		Ok(result.rows_affected() > 0)
	}

	pub async fn remove_user_from_group(&self, user_id: i64, group_id: i64) -> AuthResult<bool> {
		let result = sqlx::query("DELETE FROM user_groups WHERE userid = ? AND groupid = ?")
			.bind(user_id)
			.bind(group_id)
			.execute(self.db.pool())
			.await?;
		Ok(result.rows_affected() > 0)
	}

	/// Groups the user is directly a member of
	pub async fn user_groups(&self, user_id: i64) -> AuthResult<Vec<Group>> {
		let groups = sqlx::query_as::<_, Group>(
			"SELECT g.groupid AS id, g.name, g.inherits, g.superuser
			 FROM groups g
			 JOIN user_groups ug ON ug.groupid = g.groupid
			 WHERE ug.userid = ?
			 ORDER BY g.groupid",
		)
		.bind(user_id)
		.fetch_all(self.db.pool())
		.await?;
		Ok(groups)
	}

	/// Direct groups plus every ancestor of them, each once
	pub async fn user_groups_expanded(&self, user_id: i64) -> AuthResult<Vec<Group>> {
		let direct = self.user_groups(user_id).await?;
		let all = self.list_groups().await?;
		let parents: HashMap<i64, Option<i64>> = all.iter().map(|g| (g.id, g.inherits)).collect();

		let mut seen = HashSet::new();
		let mut wanted = Vec::new();
		for group in &direct {
			for id in std::iter::once(group.id).chain(ancestors_of(&parents, group.id)) {
				if seen.insert(id) {
					wanted.push(id);
				}
			}
		}

		let by_id: HashMap<i64, Group> = all.into_iter().map(|g| (g.id, g)).collect();
		Ok(wanted
			.into_iter()
			.filter_map(|id| by_id.get(&id).cloned())
			.collect())
	}

	/// Superuser by flag or through any (inherited) group
	pub async fn is_superuser(&self, user_id: i64) -> AuthResult<bool> {
		let Some(user) = self.get_user(user_id).await? else {
			return Ok(false);
		};
		if user.superuser {
			return Ok(true);
		}
		Ok(self
			.user_groups_expanded(user_id)
			.await?
			.iter()
			.any(|g| g.superuser))
	}
}

/// Walk `inherits` links upwards from `start`, nearest first
///
/// Stops on a repeated id or after [`MAX_RECURSE_DEPTH`] steps.
pub(crate) fn ancestors_of(parents: &HashMap<i64, Option<i64>>, start: i64) -> Vec<i64> {
	let mut out = Vec::new();
	let mut seen = HashSet::from([start]);
	let mut current = parents.get(&start).copied().flatten();

	while let Some(id) = current {
		if out.len() >= MAX_RECURSE_DEPTH || !seen.insert(id) {
			tracing::warn!(group_id = start, "group ancestry is cyclic or too deep");
			break;
		}
		out.push(id);
		current = parents.get(&id).copied().flatten();
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ancestors_nearest_first() {
		let parents = HashMap::from([(1, None), (2, Some(1)), (3, Some(2))]);
		assert_eq!(ancestors_of(&parents, 3), vec![2, 1]);
		assert!(ancestors_of(&parents, 1).is_empty());
	}

	#[test]
	fn test_ancestors_stop_on_cycle() {
		let parents = HashMap::from([(1, Some(2)), (2, Some(1))]);
		assert_eq!(ancestors_of(&parents, 1), vec![2]);
	}
}
