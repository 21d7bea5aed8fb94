//! Category hierarchy

use crate::error::{BlogError, BlogResult};
use crate::models::{Category, CategoryNode, CategoryUpdate};
use crate::slugs::{SlugTable, generic_slug};
use crate::store::{BlogStore, MAX_DEPTH};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

const CATEGORY_COLUMNS: &str = "categoryid AS id, parent, name, slug, preamble, created";

impl BlogStore {
	/// Create a category; a parent of zero or less means top level
	pub async fn create_category(
		&self,
		name: &str,
		parent: Option<i64>,
		preamble: &str,
	) -> BlogResult<Category> {
		if name.trim().is_empty() {
			return Err(BlogError::Validation("category name must not be empty".to_string()));
		}
		let parent = parent.filter(|p| *p > 0);

		let mut tx = self.db.begin().await?;
		let slug = generic_slug(&mut *tx, name, SlugTable::Categories).await?;
		let category = sqlx::query_as::<_, Category>(&format!(
			"INSERT INTO blog_categories (parent, name, slug, preamble, created)
			 VALUES (?, ?, ?, ?, ?) RETURNING {CATEGORY_COLUMNS}"
		))
		.bind(parent)
		.bind(name)
		.bind(&slug)
		.bind(preamble)
		.bind(Utc::now())
		.fetch_one(&mut *tx)
		.await?;
		tx.commit().await?;

		Ok(category)
	}

	pub async fn get_category(&self, category_id: i64) -> BlogResult<Option<Category>> {
		let category = sqlx::query_as::<_, Category>(&format!(
			"SELECT {CATEGORY_COLUMNS} FROM blog_categories WHERE categoryid = ?"
		))
		.bind(category_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(category)
	}

	async fn all_categories(&self) -> BlogResult<Vec<Category>> {
		let categories = sqlx::query_as::<_, Category>(&format!(
			"SELECT {CATEGORY_COLUMNS} FROM blog_categories ORDER BY name ASC, categoryid ASC"
		))
		.fetch_all(self.db.pool())
		.await?;
		Ok(categories)
	}

	/// Update name, preamble and parent
	///
	/// A parent change that would put the category under itself is skipped;
	/// the other changes still apply.
	pub async fn update_category(
		&self,
		category_id: i64,
		changes: &CategoryUpdate,
	) -> BlogResult<bool> {
		let Some(current) = self.get_category(category_id).await? else {
			return Err(BlogError::NotFound(format!("category {category_id}")));
		};

		let new_parent = changes.parent.filter(|p| *p > 0);
		let parent = match new_parent {
			Some(p) if self.category_descends_from(p, category_id).await? => {
				tracing::warn!(category_id, parent = p, "refusing to nest category under itself");
				current.parent
			}
			other => other,
		};

		let result = sqlx::query(
			"UPDATE blog_categories SET name = ?, preamble = ?, parent = ? WHERE categoryid = ?",
		)
		.bind(changes.name.as_deref().unwrap_or("Unnamed"))
		.bind(changes.preamble.as_deref().unwrap_or(""))
		.bind(parent)
		.bind(category_id)
		.execute(self.db.pool())
		.await?;
		Ok(result.rows_affected() > 0)
	}

	/// Whether making `new_parent` the parent of `category_id` would create
	/// a cycle
	pub async fn category_descends_from(
		&self,
		new_parent: i64,
		category_id: i64,
	) -> BlogResult<bool> {
		if new_parent == category_id {
			return Ok(true);
		}
		Ok(self.category_parents(new_parent).await?.contains(&category_id))
	}

	/// Ancestors of a category, nearest first
	pub async fn category_parents(&self, category_id: i64) -> BlogResult<Vec<i64>> {
		let parents: HashMap<i64, Option<i64>> = self
			.all_categories()
			.await?
			.into_iter()
			.map(|c| (c.id, c.parent))
			.collect();

		let mut out = Vec::new();
		let mut seen = HashSet::from([category_id]);
		let mut current = parents.get(&category_id).copied().flatten();
		while let Some(id) = current {
			if out.len() >= MAX_DEPTH || !seen.insert(id) {
				break;
			}
			out.push(id);
			current = parents.get(&id).copied().flatten();
		}
		Ok(out)
	}

	/// Every category nested under its parent, siblings by name
	pub async fn category_tree(&self) -> BlogResult<Vec<CategoryNode>> {
		let categories = self.all_categories().await?;
		let mut by_parent: HashMap<Option<i64>, Vec<Category>> = HashMap::new();
		for category in categories {
			by_parent.entry(category.parent).or_default().push(category);
		}
		let mut seen = Vec::new();
		Ok(category_branch(&by_parent, None, &mut seen))
	}
}

fn category_branch(
	by_parent: &HashMap<Option<i64>, Vec<Category>>,
	parent: Option<i64>,
	seen: &mut Vec<i64>,
) -> Vec<CategoryNode> {
	if seen.len() > MAX_DEPTH {
		return Vec::new();
	}
	let Some(members) = by_parent.get(&parent) else {
		return Vec::new();
	};
	let mut nodes = Vec::new();
	for category in members {
		if seen.contains(&category.id) {
			continue;
		}
		let ancestors = seen.clone();
		seen.push(category.id);
		let children = category_branch(by_parent, Some(category.id), seen);
		seen.pop();
		nodes.push(CategoryNode {
			category: category.clone(),
			ancestors,
			children,
		});
	}
	nodes
}
