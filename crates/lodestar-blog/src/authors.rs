//! Authors and the users who own them

use crate::error::{BlogError, BlogResult};
use crate::models::Author;
use crate::slugs::{SlugTable, generic_slug};
use crate::store::BlogStore;
use chrono::Utc;

const AUTHOR_COLUMNS: &str = "authorid AS id, name, slug, byline, created";

impl BlogStore {
	/// Create an author; `owner` becomes the user in charge of it
	pub async fn create_author(
		&self,
		name: &str,
		byline: &str,
		owner: Option<i64>,
	) -> BlogResult<Author> {
		if name.trim().is_empty() {
			return Err(BlogError::Validation("author name must not be empty".to_string()));
		}

		let mut tx = self.db.begin().await?;
		let slug = generic_slug(&mut *tx, name, SlugTable::Authors).await?;
		let author = sqlx::query_as::<_, Author>(&format!(
			"INSERT INTO blog_authors (name, slug, byline, created) VALUES (?, ?, ?, ?)
			 RETURNING {AUTHOR_COLUMNS}"
		))
		.bind(name)
		.bind(&slug)
		.bind(byline)
		.bind(Utc::now())
		.fetch_one(&mut *tx)
		.await?;

		if let Some(user_id) = owner {
			sqlx::query(
				"INSERT INTO blog_author_owners (authorid, userid, in_charge) VALUES (?, ?, 1)",
			)
			.bind(author.id)
			.bind(user_id)
			.execute(&mut *tx)
			.await?;
		}
		tx.commit().await?;

		tracing::info!(author_id = author.id, slug = %author.slug, "author created");
		Ok(author)
	}

	pub async fn get_author(&self, author_id: i64) -> BlogResult<Option<Author>> {
		let author = sqlx::query_as::<_, Author>(&format!(
			"SELECT {AUTHOR_COLUMNS} FROM blog_authors WHERE authorid = ?"
		))
		.bind(author_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(author)
	}

	/// Grant a user access to an author; returns false if already granted
	pub async fn add_author_owner(
		&self,
		author_id: i64,
		user_id: i64,
		in_charge: bool,
	) -> BlogResult<bool> {
		let result = sqlx::query(
			"INSERT OR IGNORE INTO blog_author_owners (authorid, userid, in_charge) VALUES (?, ?, ?)",
		)
		.bind(author_id)
		.bind(user_id)
		.bind(in_charge)
		.execute(self.db.pool())
		.await?;
		Ok(result.rows_affected() > 0)
	}

	/// Authors the user owns, by name
	pub async fn authors_for_user(&self, user_id: i64) -> BlogResult<Vec<Author>> {
		let authors = sqlx::query_as::<_, Author>(
			"SELECT a.authorid AS id, a.name, a.slug, a.byline, a.created
			 FROM blog_authors a
			 JOIN blog_author_owners o ON o.authorid = a.authorid
			 WHERE o.userid = ?
			 ORDER BY a.name ASC",
		)
		.bind(user_id)
		.fetch_all(self.db.pool())
		.await?;
		Ok(authors)
	}
}
