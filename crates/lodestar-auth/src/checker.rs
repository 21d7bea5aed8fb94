//! Runtime permission checks

use crate::accounts::AccountStore;
use crate::error::AuthResult;
use crate::permissions::PermissionStore;
use lodestar_db::DatabaseConnection;
use std::collections::HashSet;

/// Answers "may this user perform this action here?"
#[derive(Debug, Clone)]
pub struct PermissionChecker {
	db: DatabaseConnection,
	accounts: AccountStore,
	permissions: PermissionStore,
}

impl PermissionChecker {
	pub fn new(db: DatabaseConnection) -> Self {
		Self {
			accounts: AccountStore::new(db.clone()),
			permissions: PermissionStore::new(db.clone()),
			db,
		}
	}

	pub fn accounts(&self) -> &AccountStore {
		&self.accounts
	}

	pub fn permissions(&self) -> &PermissionStore {
		&self.permissions
	}

	/// Check `label` for `user` at `uri` within `realm`
	///
	/// Anonymous users are denied and superusers allowed. Everyone else needs
	/// the action granted, directly or through a group or one of its
	/// ancestors, in every context matching the uri.
	pub async fn can(
		&self,
		label: &str,
		uri: &str,
		realm: &str,
		user_id: Option<i64>,
	) -> AuthResult<bool> {
		let Some(user_id) = user_id else {
			return Ok(false);
		};
		let Some(user) = self.accounts.get_user(user_id).await? else {
			tracing::debug!(user_id, "permission check for unknown user");
			return Ok(false);
		};
		if user.superuser {
			return Ok(true);
		}

		let groups = self.accounts.user_groups_expanded(user_id).await?;
		if groups.iter().any(|g| g.superuser) {
			return Ok(true);
		}

		let actions = self.permissions.get_actions(realm).await?;
		let Some(action) = actions.iter().find(|a| a.label == label) else {
			tracing::debug!(realm, label, "permission check for unknown action");
			return Ok(false);
		};

		let contexts = self.permissions.context_ids_for_uri(uri, realm).await?;
		if contexts.is_empty() {
			return Ok(false);
		}

		let group_ids: HashSet<i64> = groups.iter().map(|g| g.id).collect();
		for context_id in contexts {
			let rules: Vec<(Option<i64>, Option<i64>)> = sqlx::query_as(
				"SELECT groupid, userid FROM perm_rules WHERE context = ? AND action = ?",
			)
			.bind(context_id)
			.bind(action.id)
			.fetch_all(self.db.pool())
			.await?;

			let granted = rules.iter().any(|(group, user)| {
				*user == Some(user_id) || group.is_some_and(|g| group_ids.contains(&g))
			});
			if !granted {
				tracing::debug!(realm, label, uri, user_id, context_id, "permission denied");
				return Ok(false);
			}
		}
		Ok(true)
	}
}
