//! The blog store handle

use crate::error::BlogResult;
use lodestar_db::DatabaseConnection;
use lodestar_utils::FileCache;

/// Recursion bound for category and series hierarchies
pub const MAX_DEPTH: usize = 100;

/// Database access for everything blog related
#[derive(Debug, Clone)]
pub struct BlogStore {
	pub(crate) db: DatabaseConnection,
	cache: Option<FileCache>,
}

impl BlogStore {
	pub fn new(db: DatabaseConnection) -> Self {
		Self { db, cache: None }
	}

	pub fn db(&self) -> &DatabaseConnection {
		&self.db
	}

	/// Attach the static page cache that [`BlogStore::clear_blog_cache`] purges
	pub fn with_cache(mut self, cache: FileCache) -> Self {
		self.cache = Some(cache);
		self
	}

	/// Purge cached pages so blog changes show up; returns files removed
	pub async fn clear_blog_cache(&self) -> BlogResult<usize> {
		let Some(cache) = &self.cache else {
			return Ok(0);
		};
		let removed = cache.purge().await?;
		tracing::info!(removed, "blog cache cleared");
		Ok(removed)
	}
}
