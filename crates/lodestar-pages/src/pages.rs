//! Custom pages and their versions

use crate::dirs::check_url;
use crate::error::{PageError, PageResult};
use crate::models::{CustomPage, NewPage, PageUpdate, metadata_json};
use crate::store::PageStore;
use chrono::Utc;
use lodestar_utils::unique_id::token;
use serde_json::Value;
use sqlx::SqliteConnection;

pub(crate) const PAGE_COLUMNS: &str = "pageid AS id, realm, directory, url, active, cache";

const UNIQUE_ID_LEN: usize = 24;

/// A version id no other version uses
async fn unique_version_id(conn: &mut SqliteConnection) -> PageResult<String> {
	loop {
		let candidate = token(UNIQUE_ID_LEN);
		let (count,): (i64,) =
			sqlx::query_as("SELECT COUNT(versionid) FROM custom_page_versions WHERE uniqueid = ?")
				.bind(&candidate)
				.fetch_one(&mut *conn)
				.await?;
		if count == 0 {
			return Ok(candidate);
		}
	}
}

#[allow(clippy::too_many_arguments)]
async fn insert_version(
	conn: &mut SqliteConnection,
	page_id: i64,
	publish: bool,
	raw: bool,
	formatting: &str,
	editor: Option<i64>,
	metadata: &str,
	body: &str,
) -> PageResult<String> {
	let uniqueid = unique_version_id(&mut *conn).await?;
	sqlx::query(
		"INSERT INTO custom_page_versions
		 (page, uniqueid, published, raw, formatting, editor, metadata, body, created)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(page_id)
	.bind(&uniqueid)
	.bind(publish)
	.bind(raw)
	.bind(formatting)
	.bind(editor)
	.bind(metadata)
	.bind(body)
	.bind(Utc::now())
	.execute(&mut *conn)
	.await?;
	Ok(uniqueid)
}

fn formatting_or_default(formatting: &str) -> &str {
	if formatting.trim().is_empty() { "HTML" } else { formatting }
}

impl PageStore {
	/// Create a page in `dir_path` with its first version
	pub async fn create_page(
		&self,
		realm: &str,
		dir_path: &str,
		page: &NewPage,
		publish: bool,
		raw: bool,
		active_user: Option<i64>,
	) -> PageResult<i64> {
		let url = check_url(&page.url)?;
		let directory = self.parent_dir_from_str(dir_path, realm).await?;
		if self.get_page(url, directory, realm).await?.is_some() {
			return Err(PageError::Collision(format!("page '{url}' already exists")));
		}
		let metadata = metadata_json(&page.metadata)?;

		let mut tx = self.db.begin().await?;
		let page_id = sqlx::query(
			"INSERT INTO custom_pages (realm, directory, url, active, cache) VALUES (?, ?, ?, ?, ?)",
		)
		.bind(realm)
		.bind(directory)
		.bind(url)
		.bind(publish)
		.bind(page.cache)
		.execute(&mut *tx)
		.await?
		.last_insert_rowid();

		insert_version(
			&mut *tx,
			page_id,
			publish,
			raw,
			formatting_or_default(&page.formatting),
			active_user,
			&metadata,
			&page.body,
		)
		.await?;
		tx.commit().await?;

		tracing::info!(realm, page_id, url, publish, "custom page created");
		if publish {
			self.clear_page_cache().await?;
		}
		Ok(page_id)
	}

	/// Store a new state of a page
	///
	/// Publishing marks the page active. When nothing differs from the
	/// latest version only its published flag changes; otherwise a new
	/// version is appended. `raw` defaults to the latest version's flag.
	pub async fn update_page(
		&self,
		page_id: i64,
		update: &PageUpdate,
		publish: bool,
		raw: Option<bool>,
		active_user: Option<i64>,
	) -> PageResult<()> {
		if self.get_page_by_id(page_id).await?.is_none() {
			return Err(PageError::NotFound(format!("page {page_id}")));
		}
		let last = self.latest_draft(page_id).await?;
		let raw = raw.unwrap_or_else(|| last.as_ref().is_some_and(|v| v.raw));
		let formatting = formatting_or_default(&update.formatting);
		let metadata = metadata_json(&update.metadata)?;
		let metadata_value: Value = serde_json::from_str(&metadata)?;

		let unchanged = last.as_ref().filter(|v| {
			v.raw == raw
				&& v.formatting == formatting
				&& v.body == update.body
				&& v.metadata_value() == metadata_value
		});

		let mut tx = self.db.begin().await?;
		if publish {
			sqlx::query("UPDATE custom_pages SET active = 1 WHERE pageid = ?")
				.bind(page_id)
				.execute(&mut *tx)
				.await?;
		}
		match unchanged {
			Some(version) => {
				if publish && !version.published {
					sqlx::query("UPDATE custom_page_versions SET published = 1 WHERE versionid = ?")
						.bind(version.id)
						.execute(&mut *tx)
						.await?;
				}
				tracing::debug!(page_id, "page content unchanged, no new version");
			}
			None => {
				insert_version(
					&mut *tx,
					page_id,
					publish,
					raw,
					formatting,
					active_user,
					&metadata,
					&update.body,
				)
				.await?;
			}
		}
		tx.commit().await?;

		tracing::info!(page_id, publish, "custom page updated");
		if publish {
			self.clear_page_cache().await?;
		}
		Ok(())
	}

	/// Delete a page and its versions
	pub async fn delete_page(&self, page_id: i64) -> PageResult<bool> {
		let mut tx = self.db.begin().await?;
		sqlx::query("DELETE FROM custom_page_versions WHERE page = ?")
			.bind(page_id)
			.execute(&mut *tx)
			.await?;
		let result = sqlx::query("DELETE FROM custom_pages WHERE pageid = ?")
			.bind(page_id)
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::info!(page_id, "custom page deleted");
		}
		Ok(deleted)
	}

	/// Rename a page and move it to `destination` (the realm root when `None`)
	pub async fn move_page(
		&self,
		page_id: i64,
		url: &str,
		destination: Option<i64>,
	) -> PageResult<()> {
		let url = check_url(url)?;
		let Some(page) = self.get_page_by_id(page_id).await? else {
			return Err(PageError::NotFound(format!("page {page_id}")));
		};
		if let Some(dir_id) = destination {
			match self.get_dir(dir_id).await? {
				Some(dir) if dir.realm == page.realm => {}
				Some(_) => {
					return Err(PageError::Validation(format!(
						"directory {dir_id} belongs to another realm"
					)));
				}
				None => return Err(PageError::NotFound(format!("directory {dir_id}"))),
			}
		}

		let (collisions,): (i64,) = sqlx::query_as(
			"SELECT COUNT(pageid) FROM custom_pages
			 WHERE realm = ? AND directory IS ? AND url = ? AND pageid != ?",
		)
		.bind(&page.realm)
		.bind(destination)
		.bind(url)
		.bind(page_id)
		.fetch_one(self.db.pool())
		.await?;
		if collisions > 0 {
			return Err(PageError::Collision(format!(
				"another page already uses '{url}' there"
			)));
		}

		sqlx::query("UPDATE custom_pages SET url = ?, directory = ? WHERE pageid = ?")
			.bind(url)
			.bind(destination)
			.bind(page_id)
			.execute(self.db.pool())
			.await?;
		tracing::info!(page_id, url, ?destination, "custom page moved");
		Ok(())
	}

	pub async fn get_page_by_id(&self, page_id: i64) -> PageResult<Option<CustomPage>> {
		let page = sqlx::query_as::<_, CustomPage>(&format!(
			"SELECT {PAGE_COLUMNS} FROM custom_pages WHERE pageid = ?"
		))
		.bind(page_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(page)
	}

	/// The page at `url` in a directory (the realm root when `None`)
	pub async fn get_page(
		&self,
		url: &str,
		directory: Option<i64>,
		realm: &str,
	) -> PageResult<Option<CustomPage>> {
		let page = sqlx::query_as::<_, CustomPage>(&format!(
			"SELECT {PAGE_COLUMNS} FROM custom_pages WHERE realm = ? AND directory IS ? AND url = ?"
		))
		.bind(realm)
		.bind(directory)
		.bind(url)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(page)
	}

	/// Look a page up by its directory path and url
	pub async fn page_info(&self, realm: &str, path: &str, url: &str) -> PageResult<Option<CustomPage>> {
		let directory = self.parent_dir_from_str(path, realm).await?;
		self.get_page(url, directory, realm).await
	}

	/// Full path of a page within its realm, e.g. `docs/guide/install`
	pub async fn path_by_page_id(&self, page_id: i64) -> PageResult<String> {
		let Some(page) = self.get_page_by_id(page_id).await? else {
			return Err(PageError::NotFound(format!("page {page_id}")));
		};
		self.page_path(&page).await
	}

	pub(crate) async fn page_path(&self, page: &CustomPage) -> PageResult<String> {
		let mut segments = match page.directory {
			Some(dir) => self.path_from_directory_id(dir).await.inspect_err(|e| {
				tracing::error!(page_id = page.id, directory = dir, error = %e, "custom directory lookup failed");
			})?,
			None => Vec::new(),
		};
		segments.push(page.url.clone());
		Ok(segments.join("/"))
	}

	/// Pages directly in `dir_path`
	pub async fn list_custom_pages(&self, dir_path: &str, realm: &str) -> PageResult<Vec<CustomPage>> {
		let directory = self.parent_dir_from_str(dir_path, realm).await?;
		let pages = sqlx::query_as::<_, CustomPage>(&format!(
			"SELECT {PAGE_COLUMNS} FROM custom_pages WHERE realm = ? AND directory IS ? ORDER BY url"
		))
		.bind(realm)
		.bind(directory)
		.fetch_all(self.db.pool())
		.await?;
		Ok(pages)
	}

	/// Count pages: all, active only or inactive only
	pub async fn num_custom_pages(&self, published: Option<bool>) -> PageResult<i64> {
		let sql = match published {
			None => "SELECT COUNT(pageid) FROM custom_pages",
			Some(true) => "SELECT COUNT(pageid) FROM custom_pages WHERE active",
			Some(false) => "SELECT COUNT(pageid) FROM custom_pages WHERE NOT active",
		};
		let (count,): (i64,) = sqlx::query_as(sql).fetch_one(self.db.pool()).await?;
		Ok(count)
	}
}
