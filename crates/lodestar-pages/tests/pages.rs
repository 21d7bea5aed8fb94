//! Directories, versions, moves and redirects

use lodestar_db::{DatabaseConnection, MigrationExecutor};
use lodestar_pages::{NewPage, PageError, PageStore, PageUpdate, Served};
use lodestar_utils::FileCache;
use rstest::*;
use serde_json::json;

#[fixture]
async fn pages() -> PageStore {
	let db = DatabaseConnection::connect("sqlite::memory:", 1)
		.await
		.unwrap();
	MigrationExecutor::new(db.clone()).apply_all().await.unwrap();
	sqlx::query("INSERT INTO users (username, superuser, created) VALUES ('editor', 0, '2024-01-01 00:00:00')")
		.execute(db.pool())
		.await
		.unwrap();
	PageStore::new(db)
}

fn page(url: &str, formatting: &str, body: &str) -> NewPage {
	NewPage {
		url: url.to_string(),
		cache: false,
		formatting: formatting.to_string(),
		metadata: json!({"title": url}),
		body: body.to_string(),
	}
}

fn update(formatting: &str, body: &str, title: &str) -> PageUpdate {
	PageUpdate {
		formatting: formatting.to_string(),
		metadata: json!({"title": title}),
		body: body.to_string(),
	}
}

#[rstest]
#[tokio::test]
async fn test_directories_resolve_and_collide(#[future] pages: PageStore) {
	// Arrange
	let pages = pages.await;
	let docs = pages.create_dir("public", "", "docs").await.unwrap();
	let guide = pages.create_dir("public", "/docs/", "guide").await.unwrap();

	// Act
	let duplicate = pages.create_dir("public", "docs", "guide").await;
	let other_realm = pages.create_dir("admin", "", "docs").await;

	// Assert
	assert!(matches!(duplicate, Err(PageError::Collision(_))));
	assert!(other_realm.is_ok());
	assert!(matches!(
		pages.create_dir("public", "", "").await,
		Err(PageError::Validation(_))
	));
	assert_eq!(guide.parent, Some(docs.id));
	assert_eq!(
		pages.parent_dir(&["docs", "guide"], "public").await.unwrap(),
		Some(guide.id)
	);
	assert_eq!(pages.parent_dir(&[], "public").await.unwrap(), None);
	assert!(matches!(
		pages.parent_dir_from_str("docs/missing", "public").await,
		Err(PageError::NotFound(_))
	));
	assert_eq!(
		pages.path_from_directory_id(guide.id).await.unwrap(),
		vec!["docs", "guide"]
	);
	assert_eq!(pages.list_sub_directories("docs", "public").await.unwrap().len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_dir_tree_per_realm(#[future] pages: PageStore) {
	// Arrange
	let pages = pages.await;
	let docs = pages.create_dir("public", "", "docs").await.unwrap();
	let guide = pages.create_dir("public", "docs", "guide").await.unwrap();
	pages.create_dir("public", "", "about").await.unwrap();
	let realms = vec!["public".to_string(), "admin".to_string()];

	// Act
	let tree = pages.custom_dir_tree(&realms, Some(guide.id)).await.unwrap();

	// Assert
	assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["public", "admin"]);
	let public = &tree["public"];
	assert_eq!(public.len(), 2);
	assert_eq!(public[0].dir.url, "about");
	assert_eq!(public[1].dir.id, docs.id);
	assert!(public[1].children[0].selected);
	assert!(tree["admin"].is_empty());
	let below = pages
		.custom_dir_children("public", Some(docs.id), None)
		.await
		.unwrap();
	assert_eq!(below.len(), 1);
	assert!(!below[0].selected);
}

#[rstest]
#[tokio::test]
async fn test_page_versions(#[future] pages: PageStore) {
	// Arrange
	let pages = pages.await;
	let page_id = pages
		.create_page("public", "", &page("about", "HTML", "<p>v1</p>"), false, false, Some(1))
		.await
		.unwrap();

	// Act: unpublished first version is not served
	let before = pages.serve("public", "about").await.unwrap();
	pages
		.update_page(page_id, &update("HTML", "<p>v1</p>", "about"), true, None, Some(1))
		.await
		.unwrap();
	pages
		.update_page(page_id, &update("HTML", "<p>v2</p>", "About us"), false, None, Some(1))
		.await
		.unwrap();
	pages
		.update_page(page_id, &update("Markdown", "v3", "About us"), true, Some(true), Some(1))
		.await
		.unwrap();

	// Assert
	assert_eq!(before, Served::NotFound);
	let history = pages.history(page_id).await.unwrap();
	assert_eq!(history.len(), 3);
	assert_eq!(history[0].formatting, "Markdown");
	assert!(history[0].raw);
	assert!(!history[1].published);
	assert!(history[2].published);
	assert_eq!(history[2].editor, Some(1));

	let latest = pages.latest_version(page_id).await.unwrap().unwrap();
	assert_eq!(latest.id, history[0].id);
	assert_eq!(pages.latest_version_id(page_id).await.unwrap(), Some(latest.id));
	assert_eq!(pages.latest_draft(page_id).await.unwrap().unwrap().id, latest.id);
	assert_eq!(latest.metadata_value()["title"], "About us");

	let first = &history[2];
	assert_eq!(
		pages.next_version_unique_id(page_id, first.id).await.unwrap(),
		Some(latest.uniqueid.clone())
	);
	assert_eq!(
		pages.prev_version_unique_id(page_id, latest.id).await.unwrap(),
		Some(first.uniqueid.clone())
	);
	assert_eq!(pages.prev_version_unique_id(page_id, first.id).await.unwrap(), None);
	assert_eq!(
		pages
			.page_version_by_unique_id(&first.uniqueid)
			.await
			.unwrap()
			.unwrap()
			.body,
		"<p>v1</p>"
	);
	assert!(pages.get_page_by_id(page_id).await.unwrap().unwrap().active);
	assert_eq!(pages.num_custom_pages(Some(true)).await.unwrap(), 1);
	assert_eq!(pages.num_custom_pages(Some(false)).await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn test_serve_renders_and_purifies(#[future] pages: PageStore) {
	// Arrange
	let pages = pages.await;
	pages.create_dir("public", "", "docs").await.unwrap();
	let body = "# Install\n\n<script>alert(1)</script>";
	pages
		.create_page("public", "docs", &page("install", "Markdown", body), true, false, None)
		.await
		.unwrap();

	// Act
	let served = pages.serve("public", "/docs/install/").await.unwrap();

	// Assert
	match served {
		Served::Page { page, html, .. } => {
			assert_eq!(page.url, "install");
			assert!(html.contains("<h1>Install</h1>"));
			assert!(!html.contains("script"));
		}
		other => panic!("expected a page, got {other:?}"),
	}
	assert_eq!(pages.serve("admin", "docs/install").await.unwrap(), Served::NotFound);
	assert_eq!(pages.serve("public", "nowhere/install").await.unwrap(), Served::NotFound);
}

#[rstest]
#[tokio::test]
async fn test_move_page_and_redirects(#[future] pages: PageStore) {
	// Arrange
	let pages = pages.await;
	let docs = pages.create_dir("public", "", "docs").await.unwrap();
	let old_id = pages
		.create_page("public", "", &page("install", "HTML", "<p>x</p>"), true, false, None)
		.await
		.unwrap();
	pages
		.create_page("public", "docs", &page("setup", "HTML", "<p>y</p>"), true, false, None)
		.await
		.unwrap();
	let before = pages.get_page_by_id(old_id).await.unwrap().unwrap();

	// Act
	let collision = pages.move_page(old_id, "setup", Some(docs.id)).await;
	pages.move_page(old_id, "install", Some(docs.id)).await.unwrap();
	let after = pages.get_page_by_id(old_id).await.unwrap().unwrap();
	let created = pages.create_page_redirect(&before, &after).await.unwrap();

	// Assert
	assert!(matches!(collision, Err(PageError::Collision(_))));
	assert!(created);
	assert_eq!(pages.path_by_page_id(old_id).await.unwrap(), "docs/install");
	assert!(!pages.create_page_redirect(&after, &after).await.unwrap());
	match pages.serve("public", "install").await.unwrap() {
		Served::Redirect(redirect) => assert_eq!(redirect.newpath, "docs/install"),
		other => panic!("expected a redirect, got {other:?}"),
	}
	assert!(pages.page_info("public", "docs", "install").await.unwrap().is_some());
	assert_eq!(pages.list_custom_pages("docs", "public").await.unwrap().len(), 2);
	assert!(pages.list_custom_pages("", "public").await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_dir_redirect_covers_nested_pages(#[future] pages: PageStore) {
	// Arrange
	let pages = pages.await;
	let old = pages.create_dir("public", "", "manual").await.unwrap();
	pages.create_dir("public", "manual", "advanced").await.unwrap();
	let new = pages.create_dir("public", "", "docs").await.unwrap();
	pages
		.create_page("public", "manual", &page("intro", "HTML", ""), true, false, None)
		.await
		.unwrap();
	pages
		.create_page("public", "manual/advanced", &page("tuning", "HTML", ""), true, false, None)
		.await
		.unwrap();

	// Act
	let created = pages.create_dir_redirect(old.id, new.id).await.unwrap();

	// Assert
	assert_eq!(created, 2);
	let redirect = pages
		.find_redirect("/manual/advanced/tuning", "public")
		.await
		.unwrap()
		.unwrap();
	assert_eq!(redirect.newpath, "docs/advanced/tuning");
	assert!(redirect.same_realm);
	assert_eq!(pages.create_dir_redirect(old.id, new.id).await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn test_delete_page(#[future] pages: PageStore) {
	let pages = pages.await;
	let page_id = pages
		.create_page("public", "", &page("gone", "HTML", ""), false, false, None)
		.await
		.unwrap();

	assert!(pages.delete_page(page_id).await.unwrap());
	assert!(pages.history(page_id).await.unwrap().is_empty());
	assert!(!pages.delete_page(page_id).await.unwrap());
}

#[rstest]
#[tokio::test]
async fn test_cached_pages_refresh_on_publish(#[future] pages: PageStore) {
	// Arrange
	let dir = tempfile::tempdir().unwrap();
	let cache = FileCache::new(dir.path(), vec![9u8; 32]);
	let pages = pages.await.with_cache(cache.clone());
	let mut cached = page("home", "HTML", "<p>first</p>");
	cached.cache = true;
	let page_id = pages
		.create_page("public", "", &cached, true, false, None)
		.await
		.unwrap();

	// Act
	let first = pages.serve("public", "home").await.unwrap();
	let stored = cache.get("public/home").await.unwrap();
	pages
		.update_page(page_id, &update("HTML", "<p>second</p>", "home"), true, None, None)
		.await
		.unwrap();
	let second = pages.serve("public", "home").await.unwrap();

	// Assert
	assert!(matches!(first, Served::Page { .. }));
	assert_eq!(stored.as_deref(), Some(b"<p>first</p>".as_slice()));
	let Served::Page { html, .. } = second else {
		panic!("expected a page");
	};
	assert_eq!(html, "<p>second</p>");
	assert_eq!(pages.clear_page_cache().await.unwrap(), 1);
	assert!(cache.get("public/home").await.unwrap().is_none());
}
