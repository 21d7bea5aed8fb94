//! Slug generation
//!
//! Generic slugs are unique per table; post slugs only need to be unique
//! among posts created in the same year and month. Collisions get `-2`,
//! `-3`, … appended.

use chrono::{DateTime, Datelike, Utc};
use sqlx::SqliteConnection;

/// Tables carrying a unique `slug` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugTable {
	Authors,
	Categories,
	Tags,
	Series,
}

impl SlugTable {
	fn name(self) -> &'static str {
		match self {
			SlugTable::Authors => "blog_authors",
			SlugTable::Categories => "blog_categories",
			SlugTable::Tags => "blog_tags",
			SlugTable::Series => "blog_series",
		}
	}
}

/// URL slug for a title, never empty
pub fn slug_from_title(title: &str) -> String {
	let slug = slug::slugify(title);
	if slug.is_empty() {
		"untitled".to_string()
	} else {
		slug
	}
}

/// The `n`th candidate for `base`: `base`, `base-2`, `base-3`, …
pub fn candidate(base: &str, n: u32) -> String {
	if n <= 1 {
		base.to_string()
	} else {
		format!("{base}-{n}")
	}
}

/// A slug not yet used in `table`
pub async fn generic_slug(
	conn: &mut SqliteConnection,
	name: &str,
	table: SlugTable,
) -> Result<String, sqlx::Error> {
	let base = slug_from_title(name);
	let query = format!("SELECT COUNT(*) FROM {} WHERE slug = ?", table.name());
	let mut n = 1;
	loop {
		let slug = candidate(&base, n);
		let (count,): (i64,) = sqlx::query_as(&query)
			.bind(&slug)
			.fetch_one(&mut *conn)
			.await?;
		if count == 0 {
			return Ok(slug);
		}
		n += 1;
	}
}

/// A post slug unused among posts created in the month of `when`
pub async fn post_slug(
	conn: &mut SqliteConnection,
	title: &str,
	when: DateTime<Utc>,
) -> Result<String, sqlx::Error> {
	let base = slug_from_title(title);
	let year = format!("{:04}", when.year());
	let month = format!("{:02}", when.month());
	let mut n = 1;
	loop {
		let slug = candidate(&base, n);
		let (count,): (i64,) = sqlx::query_as(
			"SELECT COUNT(*) FROM blog_posts
			 WHERE substr(created, 1, 4) = ? AND substr(created, 6, 2) = ? AND slug = ?",
		)
		.bind(&year)
		.bind(&month)
		.bind(&slug)
		.fetch_one(&mut *conn)
		.await?;
		if count == 0 {
			return Ok(slug);
		}
		n += 1;
	}
}
