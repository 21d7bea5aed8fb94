//! The facade exposes a working site through its prelude

use lodestar::prelude::*;
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn test_prelude_wires_a_site() {
	// Arrange
	let db = DatabaseConnection::connect("sqlite::memory:", 1)
		.await
		.unwrap();
	MigrationExecutor::new(db.clone()).apply_all().await.unwrap();
	let accounts = AccountStore::new(db.clone());
	let root = accounts.create_user("root", None, true).await.unwrap();
	let visitor = accounts.create_user("visitor", None, false).await.unwrap();
	let checker = PermissionChecker::new(db.clone());

	// Act
	let root_allowed = checker.can("create", "/blog", "admin", Some(root.id)).await.unwrap();
	let visitor_allowed = checker
		.can("create", "/blog", "admin", Some(visitor.id))
		.await
		.unwrap();

	// Assert
	assert!(root_allowed);
	assert!(!visitor_allowed);
	let router = build_router(std::sync::Arc::new(AppState::new(db, &Settings::default(), None)));
	assert!(!router.is_empty());
}
