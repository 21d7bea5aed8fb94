//! The custom page store handle

use crate::error::PageResult;
use lodestar_db::DatabaseConnection;
use lodestar_utils::FileCache;

/// Recursion bound for directory trees
pub const MAX_DEPTH: usize = 100;

/// Database access for custom pages, directories and redirects
#[derive(Debug, Clone)]
pub struct PageStore {
	pub(crate) db: DatabaseConnection,
	pub(crate) cache: Option<FileCache>,
}

impl PageStore {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db, cache: None }
	}

	pub fn db(&self) -> &DatabaseConnection {
		&self.db
	}

	/// Attach the static page cache used for pages flagged `cache`
	pub fn with_cache(mut self, cache: FileCache) -> Self {
		self.cache = Some(cache);
		self
	}

	/// Purge every cached page; returns files removed
	pub async fn clear_page_cache(&self) -> PageResult<usize> {
		let Some(cache) = &self.cache else {
			return Ok(0);
		};
		let removed = cache.purge().await?;
		tracing::info!(removed, "page cache cleared");
		Ok(removed)
	}
}

/// Non-empty `/`-separated segments of a path
pub fn split_path(path: &str) -> Vec<&str> {
	path.split('/').filter(|s| !s.is_empty()).collect()
}

/// A path without leading or trailing slashes and empty segments
pub fn normalize_path(path: &str) -> String {
	split_path(path).join("/")
}
