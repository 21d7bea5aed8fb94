//! Versioned blog posts

use crate::error::{BlogError, BlogResult};
use crate::models::{NewPost, Post, PostScope, PostUpdate, PostVersion};
use crate::slugs::post_slug;
use crate::store::BlogStore;
use chrono::Utc;
use lodestar_utils::unique_id;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::BTreeSet;

const POST_COLUMNS: &str = "postid AS id, author, category, title, slug, description, format, \
	shorturl, status, created, published";
const VERSION_COLUMNS: &str = "versionid AS id, post, body, format, live, published_by, created";
const SHORT_URL_LEN: usize = 8;

impl BlogStore {
	/// Create a post with its first version and tags
	///
	/// Tag ids that don't exist are dropped.
	pub async fn create_post(
		&self,
		post: &NewPost,
		publish: bool,
		active_user: Option<i64>,
	) -> BlogResult<i64> {
		if self.get_author(post.author).await?.is_none() {
			return Err(BlogError::NotFound(format!("author {}", post.author)));
		}
		let title = post
			.title
			.as_deref()
			.filter(|t| !t.trim().is_empty())
			.unwrap_or("Untitled");
		let now = Utc::now();

		let mut tx = self.db.begin().await?;
		let slug = post_slug(&mut *tx, title, now).await?;
		let shorturl = unique_short_url(&mut *tx).await?;

		let post_id = sqlx::query(
			"INSERT INTO blog_posts
			 (author, category, title, slug, description, format, shorturl, status, created, published)
			 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(post.author)
		.bind(post.category)
		.bind(title)
		.bind(&slug)
		.bind(&post.description)
		.bind(&post.format)
		.bind(&shorturl)
		.bind(publish)
		.bind(now)
		.bind(publish.then_some(now))
		.execute(&mut *tx)
		.await?
		.last_insert_rowid();

		insert_version(&mut *tx, post_id, &post.body, &post.format, publish, active_user).await?;

		let known = existing_tags(&mut *tx).await?;
		for tag in post.tags.iter().filter(|t| known.contains(*t)) {
			sqlx::query("INSERT OR IGNORE INTO blog_post_tags (postid, tagid) VALUES (?, ?)")
				.bind(post_id)
				.bind(*tag)
				.execute(&mut *tx)
				.await?;
		}
		tx.commit().await?;

		tracing::info!(post_id, slug = %slug, publish, "blog post created");
		Ok(post_id)
	}

	/// Apply a new state to a post
	///
	/// Only changed columns are written. A new version is always appended.
	/// Publishing a draft sets the published timestamp.
	pub async fn update_post(
		&self,
		post_id: i64,
		update: &PostUpdate,
		publish: bool,
		active_user: Option<i64>,
	) -> BlogResult<()> {
		let Some(old) = self.get_post(post_id).await? else {
			return Err(BlogError::NotFound(format!("post {post_id}")));
		};
		let old_tags: BTreeSet<i64> = self.tags_for_post(post_id).await?.into_iter().collect();

		let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE blog_posts SET ");
		let mut changed = false;
		{
			let mut set = builder.separated(", ");
			if let Some(author) = update.author
				&& author != old.author
			{
				set.push("author = ").push_bind_unseparated(author);
				changed = true;
			}
			if update.description != old.description {
				set.push("description = ")
					.push_bind_unseparated(update.description.clone());
				changed = true;
			}
			if update.format != old.format {
				set.push("format = ").push_bind_unseparated(update.format.clone());
				changed = true;
			}
			if update.category != old.category {
				set.push("category = ").push_bind_unseparated(update.category);
				changed = true;
			}
			if publish && !old.status {
				set.push("status = ").push_bind_unseparated(true);
				set.push("published = ").push_bind_unseparated(Utc::now());
				changed = true;
			}
			if update.title != old.title {
				set.push("title = ").push_bind_unseparated(update.title.clone());
				changed = true;
			}
		}
		builder.push(" WHERE postid = ").push_bind(post_id);

		let mut tx = self.db.begin().await?;
		if changed {
			builder.build().execute(&mut *tx).await?;
		}

		insert_version(
			&mut *tx,
			post_id,
			&update.body,
			&update.format,
			publish,
			active_user,
		)
		.await?;

		let known = existing_tags(&mut *tx).await?;
		let new_tags: BTreeSet<i64> = update
			.tags
			.iter()
			.copied()
			.filter(|t| known.contains(t))
			.collect();
		for tag in old_tags.difference(&new_tags) {
			sqlx::query("DELETE FROM blog_post_tags WHERE postid = ? AND tagid = ?")
				.bind(post_id)
				.bind(*tag)
				.execute(&mut *tx)
				.await?;
		}
		for tag in new_tags.difference(&old_tags) {
			sqlx::query("INSERT INTO blog_post_tags (postid, tagid) VALUES (?, ?)")
				.bind(post_id)
				.bind(*tag)
				.execute(&mut *tx)
				.await?;
		}
		tx.commit().await?;

		tracing::info!(post_id, publish, "blog post updated");
		Ok(())
	}

	pub async fn get_post(&self, post_id: i64) -> BlogResult<Option<Post>> {
		let post = sqlx::query_as::<_, Post>(&format!(
			"SELECT {POST_COLUMNS} FROM blog_posts WHERE postid = ?"
		))
		.bind(post_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(post)
	}

	pub async fn latest_version(&self, post_id: i64) -> BlogResult<Option<PostVersion>> {
		let version = sqlx::query_as::<_, PostVersion>(&format!(
			"SELECT {VERSION_COLUMNS} FROM blog_post_versions
			 WHERE post = ? ORDER BY versionid DESC LIMIT 1"
		))
		.bind(post_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(version)
	}

	/// Newest posts first
	pub async fn list_posts(
		&self,
		scope: PostScope,
		offset: i64,
		limit: i64,
	) -> BlogResult<Vec<Post>> {
		let posts = match scope {
			PostScope::All => {
				sqlx::query_as::<_, Post>(&format!(
					"SELECT {POST_COLUMNS} FROM blog_posts
					 ORDER BY created DESC, postid DESC LIMIT ? OFFSET ?"
				))
				.bind(limit)
				.bind(offset)
				.fetch_all(self.db.pool())
				.await?
			}
			PostScope::Published => {
				sqlx::query_as::<_, Post>(&format!(
					"SELECT {POST_COLUMNS} FROM blog_posts WHERE status = 1
					 ORDER BY created DESC, postid DESC LIMIT ? OFFSET ?"
				))
				.bind(limit)
				.bind(offset)
				.fetch_all(self.db.pool())
				.await?
			}
			PostScope::VisibleTo(user_id) => {
				sqlx::query_as::<_, Post>(&format!(
					"SELECT {POST_COLUMNS} FROM blog_posts
					 WHERE status = 1
					    OR author IN (SELECT authorid FROM blog_author_owners WHERE userid = ?)
					 ORDER BY created DESC, postid DESC LIMIT ? OFFSET ?"
				))
				.bind(user_id)
				.bind(limit)
				.bind(offset)
				.fetch_all(self.db.pool())
				.await?
			}
		};
		Ok(posts)
	}

	/// An author's posts by title, minus `exclude`
	pub async fn list_posts_for_author(
		&self,
		author_id: i64,
		exclude: &[i64],
	) -> BlogResult<Vec<Post>> {
		let posts = sqlx::query_as::<_, Post>(&format!(
			"SELECT {POST_COLUMNS} FROM blog_posts WHERE author = ? ORDER BY title ASC"
		))
		.bind(author_id)
		.fetch_all(self.db.pool())
		.await?;
		Ok(posts.into_iter().filter(|p| !exclude.contains(&p.id)).collect())
	}

	/// Count posts: all, published only or drafts only
	pub async fn num_posts(&self, published: Option<bool>) -> BlogResult<i64> {
		let sql = match published {
			None => "SELECT COUNT(postid) FROM blog_posts",
			Some(true) => "SELECT COUNT(postid) FROM blog_posts WHERE status",
			Some(false) => "SELECT COUNT(postid) FROM blog_posts WHERE NOT status",
		};
		let (count,): (i64,) = sqlx::query_as(sql).fetch_one(self.db.pool()).await?;
		Ok(count)
	}

	/// Delete a post with its versions, tags, series entries and comments
	pub async fn delete_post(&self, post_id: i64) -> BlogResult<bool> {
		let result = sqlx::query("DELETE FROM blog_posts WHERE postid = ?")
			.bind(post_id)
			.execute(self.db.pool())
			.await?;
		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::info!(post_id, "blog post deleted");
		}
		Ok(deleted)
	}
}

async fn insert_version(
	conn: &mut SqliteConnection,
	post_id: i64,
	body: &str,
	format: &str,
	publish: bool,
	active_user: Option<i64>,
) -> BlogResult<i64> {
	let id = sqlx::query(
		"INSERT INTO blog_post_versions (post, body, format, live, published_by, created)
		 VALUES (?, ?, ?, ?, ?, ?)",
	)
	.bind(post_id)
	.bind(body)
	.bind(format)
	.bind(publish)
	.bind(if publish { active_user } else { None })
	.bind(Utc::now())
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();
	Ok(id)
}

async fn existing_tags(conn: &mut SqliteConnection) -> BlogResult<BTreeSet<i64>> {
	let ids: Vec<(i64,)> = sqlx::query_as("SELECT tagid FROM blog_tags")
		.fetch_all(&mut *conn)
		.await?;
	Ok(ids.into_iter().map(|(id,)| id).collect())
}

async fn unique_short_url(conn: &mut SqliteConnection) -> BlogResult<String> {
	loop {
		let candidate = unique_id::token(SHORT_URL_LEN);
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts WHERE shorturl = ?")
			.bind(&candidate)
			.fetch_one(&mut *conn)
			.await?;
		if count == 0 {
			return Ok(candidate);
		}
	}
}
