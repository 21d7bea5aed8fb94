//! Posts, tags and categories

use lodestar_blog::{
	BlogError, BlogStore, CategoryUpdate, NewPost, PostScope, PostUpdate, TagSort,
};
use lodestar_db::{DatabaseConnection, MigrationExecutor};
use rstest::*;

#[fixture]
async fn blog() -> BlogStore {
	let db = DatabaseConnection::connect("sqlite::memory:", 1)
		.await
		.unwrap();
	MigrationExecutor::new(db.clone()).apply_all().await.unwrap();
	for name in ["writer", "reader"] {
		sqlx::query("INSERT INTO users (username, superuser, created) VALUES (?, 0, '2024-01-01 00:00:00')")
			.bind(name)
			.execute(db.pool())
			.await
			.unwrap();
	}
	BlogStore::new(db)
}

fn draft(author: i64, title: &str) -> NewPost {
	NewPost {
		author,
		category: None,
		title: Some(title.to_string()),
		description: String::new(),
		format: "Markdown".to_string(),
		body: format!("# {title}"),
		tags: Vec::new(),
	}
}

async fn slug_of(blog: &BlogStore, post_id: i64) -> String {
	blog.get_post(post_id).await.unwrap().unwrap().slug
}

#[rstest]
#[tokio::test]
async fn test_post_slugs_collide_within_month(#[future] blog: BlogStore) {
	// Arrange
	let blog = blog.await;
	let author = blog.create_author("Ada", "", Some(1)).await.unwrap();

	// Act
	let first = blog.create_post(&draft(author.id, "Hello World"), false, None).await.unwrap();
	let second = blog.create_post(&draft(author.id, "Hello World"), false, None).await.unwrap();
	let third = blog.create_post(&draft(author.id, "Hello, world!"), false, None).await.unwrap();

	// Assert
	assert_eq!(slug_of(&blog, first).await, "hello-world");
	assert_eq!(slug_of(&blog, second).await, "hello-world-2");
	assert_eq!(slug_of(&blog, third).await, "hello-world-3");
}

#[rstest]
#[tokio::test]
async fn test_create_post_defaults_and_ignores_unknown_tags(#[future] blog: BlogStore) {
	// Arrange
	let blog = blog.await;
	let author = blog.create_author("Ada", "", Some(1)).await.unwrap();
	let rust = blog.create_tag("Rust").await.unwrap();
	let mut new = draft(author.id, "");
	new.title = None;
	new.tags = vec![rust.id, 999];

	// Act
	let post_id = blog.create_post(&new, true, Some(1)).await.unwrap();

	// Assert
	let post = blog.get_post(post_id).await.unwrap().unwrap();
	assert_eq!(post.title, "Untitled");
	assert_eq!(post.slug, "untitled");
	assert!(post.status);
	assert!(post.published.is_some());
	assert_eq!(post.shorturl.len(), 8);
	assert_eq!(blog.tags_for_post(post_id).await.unwrap(), vec![rust.id]);
	let version = blog.latest_version(post_id).await.unwrap().unwrap();
	assert!(version.live);
	assert_eq!(version.published_by, Some(1));
}

#[rstest]
#[tokio::test]
async fn test_create_post_requires_author(#[future] blog: BlogStore) {
	let blog = blog.await;

	let result = blog.create_post(&draft(77, "Orphan"), false, None).await;

	assert!(matches!(result, Err(BlogError::NotFound(_))));
	assert_eq!(blog.num_posts(None).await.unwrap(), 0);
}

#[rstest]
#[tokio::test]
async fn test_update_post_versions_and_publishes(#[future] blog: BlogStore) {
	// Arrange
	let blog = blog.await;
	let author = blog.create_author("Ada", "", Some(1)).await.unwrap();
	let a = blog.create_tag("a").await.unwrap();
	let b = blog.create_tag("b").await.unwrap();
	let mut new = draft(author.id, "Draft");
	new.tags = vec![a.id];
	let post_id = blog.create_post(&new, false, Some(1)).await.unwrap();

	// Act
	let update = PostUpdate {
		author: None,
		category: None,
		title: "Final".to_string(),
		description: "now with words".to_string(),
		format: "Markdown".to_string(),
		body: "# Final".to_string(),
		tags: vec![b.id],
	};
	blog.update_post(post_id, &update, true, Some(1)).await.unwrap();

	// Assert
	let post = blog.get_post(post_id).await.unwrap().unwrap();
	assert_eq!(post.title, "Final");
	assert_eq!(post.slug, "draft");
	assert_eq!(post.description, "now with words");
	assert!(post.status && post.published.is_some());
	let latest = blog.latest_version(post_id).await.unwrap().unwrap();
	assert_eq!(latest.body, "# Final");
	assert!(latest.live);
	assert_eq!(blog.tags_for_post(post_id).await.unwrap(), vec![b.id]);
	let (versions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_post_versions WHERE post = ?")
		.bind(post_id)
		.fetch_one(blog.db().pool())
		.await
		.unwrap();
	assert_eq!(versions, 2);
}

#[rstest]
#[tokio::test]
async fn test_visibility_scope(#[future] blog: BlogStore) {
	// Arrange: writer (1) owns Ada, reader (2) owns nothing
	let blog = blog.await;
	let ada = blog.create_author("Ada", "", Some(1)).await.unwrap();
	let published = blog.create_post(&draft(ada.id, "Out"), true, Some(1)).await.unwrap();
	let hidden = blog.create_post(&draft(ada.id, "Secret"), false, None).await.unwrap();

	// Act
	let all = blog.list_posts(PostScope::All, 0, 10).await.unwrap();
	let owner = blog.list_posts(PostScope::VisibleTo(1), 0, 10).await.unwrap();
	let stranger = blog.list_posts(PostScope::VisibleTo(2), 0, 10).await.unwrap();
	let anonymous = blog.list_posts(PostScope::Published, 0, 10).await.unwrap();

	// Assert
	assert_eq!(all.len(), 2);
	assert_eq!(owner.len(), 2);
	assert_eq!(stranger.iter().map(|p| p.id).collect::<Vec<_>>(), vec![published]);
	assert_eq!(anonymous, stranger);
	assert_eq!(blog.num_posts(Some(true)).await.unwrap(), 1);
	assert_eq!(blog.num_posts(Some(false)).await.unwrap(), 1);
	let others = blog.list_posts_for_author(ada.id, &[hidden]).await.unwrap();
	assert_eq!(others.len(), 1);
	assert!(blog.delete_post(hidden).await.unwrap());
	assert_eq!(blog.num_posts(None).await.unwrap(), 1);
}

#[rstest]
#[tokio::test]
async fn test_tags_listing(#[future] blog: BlogStore) {
	// Arrange
	let blog = blog.await;
	for name in ["beta", "alpha", "gamma"] {
		blog.create_tag(name).await.unwrap();
	}
	let dup = blog.create_tag("Alpha").await.unwrap();

	// Act
	let page = blog.list_tags(1, 2, TagSort::Name, true).await.unwrap();

	// Assert
	assert_eq!(dup.slug, "alpha-2");
	assert_eq!(blog.num_tags().await.unwrap(), 4);
	assert_eq!(
		page.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
		vec!["beta", "alpha"]
	);
	assert!(blog.edit_tag(dup.id, "alpha prime").await.unwrap());
	assert_eq!(blog.get_tag(dup.id).await.unwrap().unwrap().name, "alpha prime");
	assert_eq!(blog.get_tags().await.unwrap()[0].name, "alpha");
}

#[rstest]
#[tokio::test]
async fn test_category_parent_cycle_is_skipped(#[future] blog: BlogStore) {
	// Arrange
	let blog = blog.await;
	let news = blog.create_category("News", None, "").await.unwrap();
	let local = blog.create_category("Local", Some(news.id), "").await.unwrap();
	let street = blog.create_category("Street", Some(local.id), "").await.unwrap();

	// Act: moving News under its own grandchild only renames it
	let updated = blog
		.update_category(
			news.id,
			&CategoryUpdate {
				name: Some("Headlines".to_string()),
				preamble: None,
				parent: Some(street.id),
			},
		)
		.await
		.unwrap();

	// Assert
	assert!(updated);
	let news = blog.get_category(news.id).await.unwrap().unwrap();
	assert_eq!(news.name, "Headlines");
	assert_eq!(news.parent, None);
	assert_eq!(blog.category_parents(street.id).await.unwrap(), vec![local.id, news.id]);
	assert!(blog.category_descends_from(street.id, news.id).await.unwrap());

	let tree = blog.category_tree().await.unwrap();
	assert_eq!(tree.len(), 1);
	let leaf = &tree[0].children[0].children[0];
	assert_eq!(leaf.category.id, street.id);
	assert_eq!(leaf.ancestors, vec![news.id, local.id]);
}

#[rstest]
#[tokio::test]
async fn test_category_parent_zero_means_top_level(#[future] blog: BlogStore) {
	let blog = blog.await;

	let cat = blog.create_category("Misc", Some(0), "intro").await.unwrap();

	assert_eq!(cat.parent, None);
	assert_eq!(cat.slug, "misc");
}
