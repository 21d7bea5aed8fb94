//! Persistence for actions, contexts and rules

use super::tree::{self, Grants};
use super::{
	Action, ActionSet, Context, ContextUpdate, GroupNode, PermissionMap, UserPermissionList,
};
use crate::accounts::Group;
use crate::error::{AuthError, AuthResult};
use lodestar_db::DatabaseConnection;
use regex::Regex;
use sqlx::SqliteConnection;
use std::collections::BTreeSet;

/// Which kind of subject a rule targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
	Group,
	User,
}

impl Subject {
	fn column(self) -> &'static str {
		match self {
			Subject::Group => "groupid",
			Subject::User => "userid",
		}
	}
}

/// Database-backed permission engine
#[derive(Debug, Clone)]
pub struct PermissionStore {
	db: DatabaseConnection,
}

impl PermissionStore {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db }
	}

	/// Create an action; returns false if the realm already has it
	pub async fn create_action(&self, realm: &str, label: &str) -> AuthResult<bool> {
		if label.trim().is_empty() {
			return Err(AuthError::Validation("action label must not be empty".to_string()));
		}
		let result = sqlx::query("INSERT OR IGNORE INTO perm_actions (realm, label) VALUES (?, ?)")
			.bind(realm)
			.bind(label)
			.execute(self.db.pool())
			.await?;
		let created = result.rows_affected() > 0;
		if created {
			tracing::info!(realm, label, "permission action created");
		}
		Ok(created)
	}

	/// Create a context; an empty locator means the whole realm (`/`)
	pub async fn create_context(&self, realm: &str, locator: &str) -> AuthResult<bool> {
		let locator = normalize_locator(locator);
		let result =
			sqlx::query("INSERT OR IGNORE INTO perm_contexts (realm, locator) VALUES (?, ?)")
				.bind(realm)
				.bind(locator)
				.execute(self.db.pool())
				.await?;
		let created = result.rows_affected() > 0;
		if created {
			tracing::info!(realm, locator, "permission context created");
		}
		Ok(created)
	}

	pub async fn get_action(&self, realm: &str, action_id: i64) -> AuthResult<Option<Action>> {
		let action = sqlx::query_as::<_, Action>(
			"SELECT actionid AS id, realm, label FROM perm_actions WHERE realm = ? AND actionid = ?",
		)
		.bind(realm)
		.bind(action_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(action)
	}

	pub async fn get_actions(&self, realm: &str) -> AuthResult<Vec<Action>> {
		let actions = sqlx::query_as::<_, Action>(
			"SELECT actionid AS id, realm, label FROM perm_actions WHERE realm = ? ORDER BY actionid",
		)
		.bind(realm)
		.fetch_all(self.db.pool())
		.await?;
		Ok(actions)
	}

	/// Actions of a realm as id → label
	pub async fn get_action_names(&self, realm: &str) -> AuthResult<ActionSet> {
		Ok(self
			.get_actions(realm)
			.await?
			.into_iter()
			.map(|a| (a.id, a.label))
			.collect())
	}

	/// Rename an action; an empty label changes nothing
	pub async fn save_action(&self, realm: &str, action_id: i64, label: &str) -> AuthResult<bool> {
		if label.is_empty() {
			return Ok(false);
		}
		let result = sqlx::query("UPDATE perm_actions SET label = ? WHERE actionid = ? AND realm = ?")
			.bind(label)
			.bind(action_id)
			.bind(realm)
			.execute(self.db.pool())
			.await
			.map_err(|e| {
				if crate::error::is_unique_violation(&e) {
					AuthError::Duplicate(format!("action '{label}' in realm '{realm}'"))
				} else {
					AuthError::Database(e)
				}
			})?;
		Ok(result.rows_affected() > 0)
	}

	pub async fn get_context(&self, context_id: i64, realm: &str) -> AuthResult<Option<Context>> {
		let context = sqlx::query_as::<_, Context>(
			"SELECT contextid AS id, realm, locator FROM perm_contexts WHERE realm = ? AND contextid = ?",
		)
		.bind(realm)
		.bind(context_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(context)
	}

	/// Contexts of a realm ordered by locator
	pub async fn get_contexts(&self, realm: &str) -> AuthResult<Vec<Context>> {
		let contexts = sqlx::query_as::<_, Context>(
			"SELECT contextid AS id, realm, locator FROM perm_contexts WHERE realm = ? ORDER BY locator ASC",
		)
		.bind(realm)
		.fetch_all(self.db.pool())
		.await?;
		Ok(contexts)
	}

	/// Contexts whose locator matches the start of `uri`
	pub async fn contexts_for_uri(&self, uri: &str, realm: &str) -> AuthResult<Vec<Context>> {
		Ok(self
			.get_contexts(realm)
			.await?
			.into_iter()
			.filter(|ctx| locator_matches(&ctx.locator, uri))
			.collect())
	}

	pub async fn context_ids_for_uri(&self, uri: &str, realm: &str) -> AuthResult<Vec<i64>> {
		Ok(self
			.contexts_for_uri(uri, realm)
			.await?
			.into_iter()
			.map(|ctx| ctx.id)
			.collect())
	}

	/// Labels granted directly to a group in a context
	pub async fn get_group_perms(&self, group_id: i64, context_id: i64) -> AuthResult<Vec<String>> {
		self.direct_perms(Subject::Group, group_id, context_id).await
	}

	/// Labels granted directly to a user in a context
	pub async fn get_user_perms(&self, user_id: i64, context_id: i64) -> AuthResult<Vec<String>> {
		self.direct_perms(Subject::User, user_id, context_id).await
	}

	async fn direct_perms(
		&self,
		subject: Subject,
		subject_id: i64,
		context_id: i64,
	) -> AuthResult<Vec<String>> {
		let labels: Vec<(String,)> = sqlx::query_as(&format!(
			"SELECT a.label FROM perm_rules r
			 JOIN perm_actions a ON r.action = a.actionid
			 WHERE r.context = ? AND r.{} = ?
			 ORDER BY a.actionid",
			subject.column()
		))
		.bind(context_id)
		.bind(subject_id)
		.fetch_all(self.db.pool())
		.await?;
		Ok(labels.into_iter().map(|(l,)| l).collect())
	}

	/// Every rule of a context for one subject kind, restricted to a realm
	async fn context_grants(
		conn: &mut SqliteConnection,
		subject: Subject,
		realm: &str,
		context_id: i64,
	) -> AuthResult<Grants> {
		let rows: Vec<(i64, String)> = sqlx::query_as(&format!(
			"SELECT r.{col}, a.label FROM perm_rules r
			 JOIN perm_actions a ON r.action = a.actionid
			 WHERE r.context = ? AND a.realm = ? AND r.{col} IS NOT NULL",
			col = subject.column()
		))
		.bind(context_id)
		.bind(realm)
		.fetch_all(&mut *conn)
		.await?;

		let mut grants = Grants::new();
		for (id, label) in rows {
			grants.entry(id).or_default().insert(label);
		}
		Ok(grants)
	}

	async fn groups(&self) -> AuthResult<Vec<Group>> {
		let groups = sqlx::query_as::<_, Group>(
			"SELECT groupid AS id, name, inherits, superuser FROM groups ORDER BY groupid",
		)
		.fetch_all(self.db.pool())
		.await?;
		Ok(groups)
	}

	/// Group forest for one context
	pub async fn build_group_tree(
		&self,
		realm: &str,
		context_id: i64,
		actions: &ActionSet,
	) -> AuthResult<Vec<GroupNode>> {
		if realm.is_empty() || actions.is_empty() || context_id == 0 {
			return Ok(Vec::new());
		}
		let groups = self.groups().await?;
		let mut conn = self.db.pool().acquire().await?;
		let grants = Self::context_grants(&mut *conn, Subject::Group, realm, context_id).await?;
		Ok(tree::group_tree(&groups, &grants, actions))
	}

	/// Group forest AND-combined across several contexts
	pub async fn build_multi_context_group_tree(
		&self,
		realm: &str,
		contexts: &[i64],
		actions: &ActionSet,
	) -> AuthResult<Vec<GroupNode>> {
		let mut trees = Vec::with_capacity(contexts.len());
		for context_id in contexts {
			trees.push(self.build_group_tree(realm, *context_id, actions).await?);
		}
		Ok(tree::combine_trees(trees))
	}

	/// Users with direct grants in one context
	pub async fn build_user_list(
		&self,
		realm: &str,
		context_id: i64,
		actions: &ActionSet,
	) -> AuthResult<UserPermissionList> {
		if realm.is_empty() || actions.is_empty() || context_id == 0 {
			return Ok(UserPermissionList::new());
		}
		let mut conn = self.db.pool().acquire().await?;
		let grants = Self::context_grants(&mut *conn, Subject::User, realm, context_id).await?;
		Ok(tree::user_list(&grants, actions))
	}

	/// User list AND-combined across several contexts
	pub async fn build_multi_context_user_list(
		&self,
		realm: &str,
		contexts: &[i64],
		actions: &ActionSet,
	) -> AuthResult<UserPermissionList> {
		let mut lists = Vec::with_capacity(contexts.len());
		for context_id in contexts {
			lists.push(self.build_user_list(realm, *context_id, actions).await?);
		}
		Ok(tree::combine_user_lists(lists))
	}

	/// Replace a context's locator and rules with `update`
	///
	/// Only rules that differ from the stored state are inserted or deleted.
	/// Labels outside the realm's actions are ignored.
	pub async fn save_context(
		&self,
		realm: &str,
		context_id: i64,
		update: &ContextUpdate,
	) -> AuthResult<()> {
		if self.get_context(context_id, realm).await?.is_none() {
			return Err(AuthError::NotFound(format!(
				"context {context_id} in realm '{realm}'"
			)));
		}
		let actions = self.get_action_names(realm).await?;

		let mut tx = self.db.begin().await?;

		sqlx::query("UPDATE perm_contexts SET locator = ? WHERE realm = ? AND contextid = ?")
			.bind(normalize_locator(&update.locator))
			.bind(realm)
			.bind(context_id)
			.execute(&mut *tx)
			.await
			.map_err(|e| {
				if crate::error::is_unique_violation(&e) {
					AuthError::Duplicate(format!("context '{}'", update.locator))
				} else {
					AuthError::Database(e)
				}
			})?;

		for (subject, desired) in [
			(Subject::Group, &update.group_perms),
			(Subject::User, &update.user_perms),
		] {
			let stored = Self::context_grants(&mut *tx, subject, realm, context_id).await?;
			let stored = flatten(&stored);
			let wanted = desired_rules(desired, &actions);

			for (subject_id, label) in stored.difference(&wanted) {
				if let Some(action_id) = action_id(&actions, label) {
					sqlx::query(&format!(
						"DELETE FROM perm_rules WHERE context = ? AND action = ? AND {} = ?",
						subject.column()
					))
					.bind(context_id)
					.bind(action_id)
					.bind(*subject_id)
					.execute(&mut *tx)
					.await?;
				}
			}
			for (subject_id, label) in wanted.difference(&stored) {
				if let Some(action_id) = action_id(&actions, label) {
					sqlx::query(&format!(
						"INSERT INTO perm_rules (context, action, {}) VALUES (?, ?, ?)",
						subject.column()
					))
					.bind(context_id)
					.bind(action_id)
					.bind(*subject_id)
					.execute(&mut *tx)
					.await?;
				}
			}
		}

		tx.commit().await?;
		tracing::info!(realm, context_id, "permission context saved");
		Ok(())
	}
}

fn normalize_locator(locator: &str) -> &str {
	if locator.is_empty() { "/" } else { locator }
}

/// Match a locator against a path, anchored at the start
///
/// Locators that fail to compile never match.
pub fn locator_matches(locator: &str, uri: &str) -> bool {
	match Regex::new(&format!("^(?:{locator})")) {
		Ok(re) => re.is_match(uri),
		Err(e) => {
			tracing::warn!(locator, error = %e, "invalid permission locator");
			false
		}
	}
}

fn flatten(grants: &Grants) -> BTreeSet<(i64, String)> {
	grants
		.iter()
		.flat_map(|(id, labels)| labels.iter().map(move |l| (*id, l.clone())))
		.collect()
}

fn desired_rules(
	desired: &std::collections::BTreeMap<i64, PermissionMap>,
	actions: &ActionSet,
) -> BTreeSet<(i64, String)> {
	desired
		.iter()
		.flat_map(|(id, perms)| {
			actions
				.values()
				.filter(|label| perms.get(*label).copied().unwrap_or(false))
				.map(move |label| (*id, label.clone()))
		})
		.collect()
}

fn action_id(actions: &ActionSet, label: &str) -> Option<i64> {
	actions
		.iter()
		.find(|(_, l)| l.as_str() == label)
		.map(|(id, _)| *id)
}
