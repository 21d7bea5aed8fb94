//! Page version history

use crate::error::PageResult;
use crate::models::PageVersion;
use crate::store::PageStore;

const VERSION_COLUMNS: &str =
	"versionid AS id, page, uniqueid, published, raw, formatting, editor, metadata, body, created";

impl PageStore {
	/// Every version of a page, newest first
	pub async fn history(&self, page_id: i64) -> PageResult<Vec<PageVersion>> {
		let versions = sqlx::query_as::<_, PageVersion>(&format!(
			"SELECT {VERSION_COLUMNS} FROM custom_page_versions WHERE page = ? ORDER BY versionid DESC"
		))
		.bind(page_id)
		.fetch_all(self.db.pool())
		.await?;
		Ok(versions)
	}

	/// The newest version, published or not
	pub async fn latest_draft(&self, page_id: i64) -> PageResult<Option<PageVersion>> {
		let version = sqlx::query_as::<_, PageVersion>(&format!(
			"SELECT {VERSION_COLUMNS} FROM custom_page_versions
			 WHERE page = ? ORDER BY versionid DESC LIMIT 1"
		))
		.bind(page_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(version)
	}

	/// The newest published version
	pub async fn latest_version(&self, page_id: i64) -> PageResult<Option<PageVersion>> {
		let version = sqlx::query_as::<_, PageVersion>(&format!(
			"SELECT {VERSION_COLUMNS} FROM custom_page_versions
			 WHERE page = ? AND published ORDER BY versionid DESC LIMIT 1"
		))
		.bind(page_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(version)
	}

	pub async fn latest_version_id(&self, page_id: i64) -> PageResult<Option<i64>> {
		Ok(self.latest_version(page_id).await?.map(|v| v.id))
	}

	pub async fn page_version_by_unique_id(&self, unique_id: &str) -> PageResult<Option<PageVersion>> {
		let version = sqlx::query_as::<_, PageVersion>(&format!(
			"SELECT {VERSION_COLUMNS} FROM custom_page_versions WHERE uniqueid = ?"
		))
		.bind(unique_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(version)
	}

	/// Nearest older published version
	pub async fn prev_version_unique_id(
		&self,
		page_id: i64,
		current_version: i64,
	) -> PageResult<Option<String>> {
		let row: Option<(String,)> = sqlx::query_as(
			"SELECT uniqueid FROM custom_page_versions
			 WHERE page = ? AND versionid < ? AND published
			 ORDER BY versionid DESC LIMIT 1",
		)
		.bind(page_id)
		.bind(current_version)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(row.map(|(id,)| id))
	}

	/// Nearest newer published version
	pub async fn next_version_unique_id(
		&self,
		page_id: i64,
		current_version: i64,
	) -> PageResult<Option<String>> {
		let row: Option<(String,)> = sqlx::query_as(
			"SELECT uniqueid FROM custom_page_versions
			 WHERE page = ? AND versionid > ? AND published
			 ORDER BY versionid ASC LIMIT 1",
		)
		.bind(page_id)
		.bind(current_version)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(row.map(|(id,)| id))
	}
}
