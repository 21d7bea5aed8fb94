//! Moderated, versioned comments

use crate::error::BlogResult;
use crate::models::{Comment, CommentDetail};
use crate::store::BlogStore;
use chrono::Utc;
use std::collections::HashMap;

const COMMENT_COLUMNS: &str = "commentid AS id, blogpost, replyto, author, approved, metadata, created";

impl BlogStore {
	/// Add an unapproved comment with its first version
	pub async fn add_comment(
		&self,
		post_id: i64,
		author: Option<i64>,
		reply_to: Option<i64>,
		message: &str,
		metadata: &serde_json::Value,
	) -> BlogResult<i64> {
		let metadata = serde_json::to_string(metadata)?;
		let now = Utc::now();

		let mut tx = self.db.begin().await?;
		let comment_id = sqlx::query(
			"INSERT INTO blog_comments (blogpost, replyto, author, approved, metadata, created)
			 VALUES (?, ?, ?, 0, ?, ?)",
		)
		.bind(post_id)
		.bind(reply_to)
		.bind(author)
		.bind(&metadata)
		.bind(now)
		.execute(&mut *tx)
		.await?
		.last_insert_rowid();

		sqlx::query(
			"INSERT INTO blog_comment_versions (comment, message, approved, created)
			 VALUES (?, ?, 0, ?)",
		)
		.bind(comment_id)
		.bind(message)
		.bind(now)
		.execute(&mut *tx)
		.await?;
		tx.commit().await?;

		tracing::debug!(comment_id, post_id, "comment added");
		Ok(comment_id)
	}

	async fn comment_row(&self, comment_id: i64) -> BlogResult<Option<Comment>> {
		let comment = sqlx::query_as::<_, Comment>(&format!(
			"SELECT {COMMENT_COLUMNS} FROM blog_comments WHERE commentid = ?"
		))
		.bind(comment_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(comment)
	}

	/// A comment without its parent or post
	async fn comment_detail(&self, comment: Comment) -> BlogResult<CommentDetail> {
		let body: Option<(String,)> = sqlx::query_as(
			"SELECT message FROM blog_comment_versions
			 WHERE comment = ? ORDER BY versionid DESC LIMIT 1",
		)
		.bind(comment.id)
		.fetch_optional(self.db.pool())
		.await?;

		let author_name = match comment.author {
			Some(author) => self.get_author(author).await?.map(|a| a.name),
			None => None,
		};
		let metadata = serde_json::from_str(&comment.metadata).unwrap_or_else(|e| {
			tracing::warn!(comment_id = comment.id, error = %e, "unreadable comment metadata");
			serde_json::Value::Null
		});

		Ok(CommentDetail {
			comment,
			body: body.map(|(m,)| m),
			author_name,
			metadata,
			parent: None,
			post: None,
		})
	}

	/// Load a comment with its latest message
	///
	/// With `include_reply_to` the replied-to comment (one level) and the
	/// post are attached too.
	pub async fn get_comment(
		&self,
		comment_id: i64,
		include_reply_to: bool,
	) -> BlogResult<Option<CommentDetail>> {
		let Some(comment) = self.comment_row(comment_id).await? else {
			return Ok(None);
		};
		let mut detail = self.comment_detail(comment).await?;

		if include_reply_to {
			if let Some(parent_id) = detail.comment.replyto
				&& let Some(parent) = self.comment_row(parent_id).await?
			{
				detail.parent = Some(Box::new(self.comment_detail(parent).await?));
			}
			detail.post = self.get_post(detail.comment.blogpost).await?;
		}
		Ok(Some(detail))
	}

	/// Newest comments first, each with its post
	pub async fn list_comments(&self, offset: i64, limit: i64) -> BlogResult<Vec<CommentDetail>> {
		let comments = sqlx::query_as::<_, Comment>(&format!(
			"SELECT {COMMENT_COLUMNS} FROM blog_comments
			 ORDER BY created DESC, commentid DESC LIMIT ? OFFSET ?"
		))
		.bind(limit)
		.bind(offset)
		.fetch_all(self.db.pool())
		.await?;

		let mut posts = HashMap::new();
		let mut out = Vec::with_capacity(comments.len());
		for comment in comments {
			let post_id = comment.blogpost;
			if !posts.contains_key(&post_id) {
				posts.insert(post_id, self.get_post(post_id).await?);
			}
			let mut detail = self.comment_detail(comment).await?;
			detail.post = posts.get(&post_id).cloned().flatten();
			out.push(detail);
		}
		Ok(out)
	}

	pub async fn publish_comment(&self, comment_id: i64) -> BlogResult<bool> {
		self.set_comment_approval(comment_id, true).await
	}

	pub async fn hide_comment(&self, comment_id: i64) -> BlogResult<bool> {
		self.set_comment_approval(comment_id, false).await
	}

	/// Flip the comment and its latest version
	async fn set_comment_approval(&self, comment_id: i64, approved: bool) -> BlogResult<bool> {
		let mut tx = self.db.begin().await?;
		let result = sqlx::query("UPDATE blog_comments SET approved = ? WHERE commentid = ?")
			.bind(approved)
			.bind(comment_id)
			.execute(&mut *tx)
			.await?;
		sqlx::query(
			"UPDATE blog_comment_versions SET approved = ?
			 WHERE versionid = (SELECT MAX(versionid) FROM blog_comment_versions WHERE comment = ?)",
		)
		.bind(approved)
		.bind(comment_id)
		.execute(&mut *tx)
		.await?;
		tx.commit().await?;

		tracing::info!(comment_id, approved, "comment moderated");
		Ok(result.rows_affected() > 0)
	}

	/// Delete a comment and its versions
	pub async fn delete_comment(&self, comment_id: i64) -> BlogResult<bool> {
		let mut tx = self.db.begin().await?;
		sqlx::query("DELETE FROM blog_comment_versions WHERE comment = ?")
			.bind(comment_id)
			.execute(&mut *tx)
			.await?;
		let result = sqlx::query("DELETE FROM blog_comments WHERE commentid = ?")
			.bind(comment_id)
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;
		Ok(result.rows_affected() > 0)
	}

	/// Count comments: all, approved only or pending only
	pub async fn num_comments(&self, approved: Option<bool>) -> BlogResult<i64> {
		let sql = match approved {
			None => "SELECT COUNT(commentid) FROM blog_comments",
			Some(true) => "SELECT COUNT(commentid) FROM blog_comments WHERE approved",
			Some(false) => "SELECT COUNT(commentid) FROM blog_comments WHERE NOT approved",
		};
		let (count,): (i64,) = sqlx::query_as(sql).fetch_one(self.db.pool()).await?;
		Ok(count)
	}
}
