//! Users, groups and memberships

use lodestar_auth::{AccountStore, AuthError};
use lodestar_db::{DatabaseConnection, MigrationExecutor};
use rstest::*;

#[fixture]
async fn accounts() -> AccountStore {
	let db = DatabaseConnection::connect("sqlite::memory:", 1)
		.await
		.unwrap();
	MigrationExecutor::new(db.clone()).apply_all().await.unwrap();
	AccountStore::new(db)
}

#[rstest]
#[tokio::test]
async fn test_duplicate_username(#[future] accounts: AccountStore) {
	let accounts = accounts.await;
	accounts.create_user("sam", Some("Sam"), false).await.unwrap();

	let result = accounts.create_user("sam", None, false).await;

	assert!(matches!(result, Err(AuthError::Duplicate(_))));
	assert_eq!(accounts.list_users().await.unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_group_parent_must_exist(#[future] accounts: AccountStore) {
	let accounts = accounts.await;

	let result = accounts.create_group("Orphans", Some(99), false).await;

	assert!(matches!(result, Err(AuthError::NotFound(_))));
}

#[rstest]
#[tokio::test]
async fn test_set_group_parent_rejects_cycles(#[future] accounts: AccountStore) {
	// Arrange
	let accounts = accounts.await;
	let a = accounts.create_group("A", None, false).await.unwrap();
	let b = accounts.create_group("B", Some(a.id), false).await.unwrap();
	let c = accounts.create_group("C", Some(b.id), false).await.unwrap();

	// Act
	let onto_self = accounts.set_group_parent(a.id, Some(a.id)).await;
	let onto_descendant = accounts.set_group_parent(a.id, Some(c.id)).await;
	let detach = accounts.set_group_parent(c.id, None).await;

	// Assert
	assert!(matches!(onto_self, Err(AuthError::InvalidHierarchy(_))));
	assert!(matches!(onto_descendant, Err(AuthError::InvalidHierarchy(_))));
	assert!(detach.is_ok());
	assert!(!accounts.group_descends_from(c.id, a.id).await.unwrap());
	assert_eq!(accounts.group_ancestors(b.id).await.unwrap(), vec![a.id]);
}

#[rstest]
#[tokio::test]
async fn test_expanded_groups_include_ancestors_once(#[future] accounts: AccountStore) {
	// Arrange
	let accounts = accounts.await;
	let staff = accounts.create_group("Staff", None, false).await.unwrap();
	let writers = accounts.create_group("Writers", Some(staff.id), false).await.unwrap();
	let editors = accounts.create_group("Editors", Some(staff.id), false).await.unwrap();
	let user = accounts.create_user("kim", None, false).await.unwrap();
	accounts.add_user_to_group(user.id, writers.id).await.unwrap();
	accounts.add_user_to_group(user.id, editors.id).await.unwrap();

	// Act
	let direct = accounts.user_groups(user.id).await.unwrap();
	let expanded: Vec<i64> = accounts
		.user_groups_expanded(user.id)
		.await
		.unwrap()
		.into_iter()
		.map(|g| g.id)
		.collect();

	// Assert
	assert_eq!(direct.len(), 2);
	assert_eq!(expanded, vec![writers.id, staff.id, editors.id]);
	assert!(!accounts.add_user_to_group(user.id, writers.id).await.unwrap());
	assert!(accounts.remove_user_from_group(user.id, writers.id).await.unwrap());
	assert!(!accounts.is_superuser(user.id).await.unwrap());
}
