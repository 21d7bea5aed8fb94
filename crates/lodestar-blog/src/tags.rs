//! Tags

use crate::error::{BlogError, BlogResult};
use crate::models::{Tag, TagSort};
use crate::slugs::{SlugTable, generic_slug};
use crate::store::BlogStore;
use chrono::Utc;

const TAG_COLUMNS: &str = "tagid AS id, name, slug, created";

impl BlogStore {
	pub async fn create_tag(&self, name: &str) -> BlogResult<Tag> {
		if name.trim().is_empty() {
			return Err(BlogError::Validation("tag name must not be empty".to_string()));
		}
		let mut tx = self.db.begin().await?;
		let slug = generic_slug(&mut *tx, name, SlugTable::Tags).await?;
		let tag = sqlx::query_as::<_, Tag>(&format!(
			"INSERT INTO blog_tags (name, slug, created) VALUES (?, ?, ?) RETURNING {TAG_COLUMNS}"
		))
		.bind(name)
		.bind(&slug)
		.bind(Utc::now())
		.fetch_one(&mut *tx)
		.await?;
		tx.commit().await?;
		Ok(tag)
	}

	/// Rename a tag; the slug is kept
	pub async fn edit_tag(&self, tag_id: i64, name: &str) -> BlogResult<bool> {
		let result = sqlx::query("UPDATE blog_tags SET name = ? WHERE tagid = ?")
			.bind(name)
			.bind(tag_id)
			.execute(self.db.pool())
			.await?;
		Ok(result.rows_affected() > 0)
	}

	/// Every tag by name
	pub async fn get_tags(&self) -> BlogResult<Vec<Tag>> {
		let tags = sqlx::query_as::<_, Tag>(&format!(
			"SELECT {TAG_COLUMNS} FROM blog_tags ORDER BY name ASC"
		))
		.fetch_all(self.db.pool())
		.await?;
		Ok(tags)
	}

	pub async fn get_tag(&self, tag_id: i64) -> BlogResult<Option<Tag>> {
		let tag = sqlx::query_as::<_, Tag>(&format!(
			"SELECT {TAG_COLUMNS} FROM blog_tags WHERE tagid = ?"
		))
		.bind(tag_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(tag)
	}

	/// One page of tags
	pub async fn list_tags(
		&self,
		offset: i64,
		limit: i64,
		sort: TagSort,
		desc: bool,
	) -> BlogResult<Vec<Tag>> {
		let direction = if desc { "DESC" } else { "ASC" };
		let tags = sqlx::query_as::<_, Tag>(&format!(
			"SELECT {TAG_COLUMNS} FROM blog_tags ORDER BY {} {direction}, tagid {direction}
			 LIMIT ? OFFSET ?",
			sort.column()
		))
		.bind(limit)
		.bind(offset)
		.fetch_all(self.db.pool())
		.await?;
		Ok(tags)
	}

	pub async fn num_tags(&self) -> BlogResult<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(tagid) FROM blog_tags")
			.fetch_one(self.db.pool())
			.await?;
		Ok(count)
	}

	/// Ids of the tags attached to a post
	pub async fn tags_for_post(&self, post_id: i64) -> BlogResult<Vec<i64>> {
		let ids: Vec<(i64,)> =
			sqlx::query_as("SELECT tagid FROM blog_post_tags WHERE postid = ? ORDER BY tagid")
				.bind(post_id)
				.fetch_all(self.db.pool())
				.await?;
		Ok(ids.into_iter().map(|(id,)| id).collect())
	}
}
