//! JSON views and the public page fallback

pub mod blog;
pub mod pages;
pub mod permissions;

use serde::Deserialize;

pub(crate) const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// `?offset=&limit=` paging, clamped to sane values
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Paging {
	pub offset: Option<i64>,
	pub limit: Option<i64>,
}

impl Paging {
	pub fn offset(&self) -> i64 {
		self.offset.unwrap_or(0).max(0)
	}

	pub fn limit(&self) -> i64 {
		self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
	}
}
