//! Ordered series of posts and nested series

use crate::error::{BlogError, BlogResult};
use crate::models::{NewSeries, Series, SeriesItem, SeriesItemRef, SeriesNode, SeriesUpdate};
use crate::slugs::{SlugTable, generic_slug};
use crate::store::{BlogStore, MAX_DEPTH};
use chrono::Utc;
use sqlx::SqliteConnection;
use std::collections::{HashMap, HashSet};

const SERIES_COLUMNS: &str = "seriesid AS id, author, name, slug, preamble, format, config, created";

fn config_json(config: Option<&serde_json::Value>) -> BlogResult<String> {
	match config {
		Some(value) => Ok(serde_json::to_string(value)?),
		None => Ok("{}".to_string()),
	}
}

async fn insert_item(
	conn: &mut SqliteConnection,
	parent: i64,
	item: SeriesItemRef,
	listorder: i64,
) -> BlogResult<()> {
	let (column, id) = item.column();
	sqlx::query(&format!(
		"INSERT INTO blog_series_items (parent, {column}, listorder) VALUES (?, ?, ?)"
	))
	.bind(parent)
	.bind(id)
	.bind(listorder)
	.execute(&mut *conn)
	.await?;
	Ok(())
}

impl BlogStore {
	/// Create a series and its items in the given order
	pub async fn create_series(&self, new: &NewSeries) -> BlogResult<i64> {
		if new.name.trim().is_empty() {
			return Err(BlogError::Validation("series name must not be empty".to_string()));
		}
		let config = config_json(new.config.as_ref())?;

		let mut tx = self.db.begin().await?;
		let slug = generic_slug(&mut *tx, &new.name, SlugTable::Series).await?;
		let series_id = sqlx::query(
			"INSERT INTO blog_series (author, name, slug, preamble, format, config, created)
			 VALUES (?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(new.author)
		.bind(&new.name)
		.bind(&slug)
		.bind(&new.preamble)
		.bind(&new.format)
		.bind(&config)
		.bind(Utc::now())
		.execute(&mut *tx)
		.await?
		.last_insert_rowid();

		for (position, item) in new.items.iter().enumerate() {
			insert_item(&mut *tx, series_id, *item, position as i64 + 1).await?;
		}
		tx.commit().await?;

		tracing::info!(series_id, items = new.items.len(), "series created");
		Ok(series_id)
	}

	/// Replace a series' fields and items
	///
	/// Items missing from `update.items` are removed, new ones inserted and
	/// every remaining item renumbered to its submitted position.
	pub async fn update_series(
		&self,
		series_id: i64,
		update: &SeriesUpdate,
		old_items: &[SeriesItemRef],
	) -> BlogResult<()> {
		if self.get_series(series_id).await?.is_none() {
			return Err(BlogError::NotFound(format!("series {series_id}")));
		}
		let config = config_json(update.config.as_ref())?;

		let mut seen = HashSet::new();
		let new_items: Vec<SeriesItemRef> = update
			.items
			.iter()
			.copied()
			.filter(|item| seen.insert(*item))
			.collect();
		let old: HashSet<SeriesItemRef> = old_items.iter().copied().collect();

		let mut tx = self.db.begin().await?;
		for item in old_items.iter().filter(|i| !seen.contains(*i)) {
			let (column, id) = item.column();
			sqlx::query(&format!(
				"DELETE FROM blog_series_items WHERE parent = ? AND {column} = ?"
			))
			.bind(series_id)
			.bind(id)
			.execute(&mut *tx)
			.await?;
		}

		sqlx::query(
			"UPDATE blog_series SET name = ?, preamble = ?, format = ?, config = ?,
			 author = COALESCE(?, author) WHERE seriesid = ?",
		)
		.bind(&update.name)
		.bind(&update.preamble)
		.bind(&update.format)
		.bind(&config)
		.bind(update.author)
		.bind(series_id)
		.execute(&mut *tx)
		.await?;

		for (position, item) in new_items.iter().enumerate() {
			let listorder = position as i64 + 1;
			if old.contains(item) {
				let (column, id) = item.column();
				sqlx::query(&format!(
					"UPDATE blog_series_items SET listorder = ? WHERE parent = ? AND {column} = ?"
				))
				.bind(listorder)
				.bind(series_id)
				.bind(id)
				.execute(&mut *tx)
				.await?;
			} else {
				insert_item(&mut *tx, series_id, *item, listorder).await?;
			}
		}
		tx.commit().await?;

		tracing::info!(series_id, items = new_items.len(), "series updated");
		Ok(())
	}

	pub async fn get_series(&self, series_id: i64) -> BlogResult<Option<Series>> {
		let series = sqlx::query_as::<_, Series>(&format!(
			"SELECT {SERIES_COLUMNS} FROM blog_series WHERE seriesid = ?"
		))
		.bind(series_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(series)
	}

	/// Items of a series in list order, titled by the post or child series
	pub async fn series_items(&self, series_id: i64) -> BlogResult<Vec<SeriesItem>> {
		let items = sqlx::query_as::<_, SeriesItem>(
			"SELECT i.itemid AS id, i.parent, i.series, i.post, i.listorder,
			        COALESCE(s.name, p.title) AS title
			 FROM blog_series_items i
			 LEFT JOIN blog_series s ON i.series = s.seriesid
			 LEFT JOIN blog_posts p ON i.post = p.postid
			 WHERE i.parent = ?
			 ORDER BY i.listorder ASC",
		)
		.bind(series_id)
		.fetch_all(self.db.pool())
		.await?;
		Ok(items)
	}

	pub async fn all_series(&self, offset: i64, limit: i64) -> BlogResult<Vec<Series>> {
		let series = sqlx::query_as::<_, Series>(&format!(
			"SELECT {SERIES_COLUMNS} FROM blog_series ORDER BY name ASC LIMIT ? OFFSET ?"
		))
		.bind(limit)
		.bind(offset)
		.fetch_all(self.db.pool())
		.await?;
		Ok(series)
	}

	/// Series written by any author the user owns
	pub async fn series_for_user(
		&self,
		user_id: i64,
		offset: i64,
		limit: i64,
	) -> BlogResult<Vec<Series>> {
		let series = sqlx::query_as::<_, Series>(&format!(
			"SELECT {SERIES_COLUMNS} FROM blog_series
			 WHERE author IN (SELECT authorid FROM blog_author_owners WHERE userid = ?)
			 ORDER BY name ASC LIMIT ? OFFSET ?"
		))
		.bind(user_id)
		.bind(limit)
		.bind(offset)
		.fetch_all(self.db.pool())
		.await?;
		Ok(series)
	}

	pub async fn series_for_author(
		&self,
		author_id: i64,
		exclude: &[i64],
	) -> BlogResult<Vec<Series>> {
		let series = sqlx::query_as::<_, Series>(&format!(
			"SELECT {SERIES_COLUMNS} FROM blog_series WHERE author = ? ORDER BY name ASC"
		))
		.bind(author_id)
		.fetch_all(self.db.pool())
		.await?;
		Ok(series.into_iter().filter(|s| !exclude.contains(&s.id)).collect())
	}

	pub async fn num_series(&self) -> BlogResult<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(seriesid) FROM blog_series")
			.fetch_one(self.db.pool())
			.await?;
		Ok(count)
	}

	pub async fn num_series_for_user(&self, user_id: i64) -> BlogResult<i64> {
		let (count,): (i64,) = sqlx::query_as(
			"SELECT COUNT(seriesid) FROM blog_series
			 WHERE author IN (SELECT authorid FROM blog_author_owners WHERE userid = ?)",
		)
		.bind(user_id)
		.fetch_one(self.db.pool())
		.await?;
		Ok(count)
	}

	pub async fn num_items_in_series(&self, series_id: i64) -> BlogResult<i64> {
		let (count,): (i64,) =
			sqlx::query_as("SELECT COUNT(itemid) FROM blog_series_items WHERE parent = ?")
				.bind(series_id)
				.fetch_one(self.db.pool())
				.await?;
		Ok(count)
	}

	/// Child series id → parents containing it
	async fn series_parent_edges(&self) -> BlogResult<HashMap<i64, Vec<i64>>> {
		let rows: Vec<(i64, i64)> = sqlx::query_as(
			"SELECT series, parent FROM blog_series_items
			 WHERE series IS NOT NULL ORDER BY parent, listorder",
		)
		.fetch_all(self.db.pool())
		.await?;
		let mut edges: HashMap<i64, Vec<i64>> = HashMap::new();
		for (child, parent) in rows {
			edges.entry(child).or_default().push(parent);
		}
		Ok(edges)
	}

	/// Each id preceded by the series containing it, recursively
	pub async fn all_series_parents(&self, series_ids: &[i64]) -> BlogResult<Vec<i64>> {
		let edges = self.series_parent_edges().await?;
		let mut out = Vec::new();
		parents_first(&edges, series_ids, 0, &mut HashSet::new(), &mut out);
		Ok(out)
	}

	/// Series nested by containment
	///
	/// With no root, the top level holds series that no other series
	/// contains. A series appears at most once on any path, and its children
	/// are expanded only the first time it is reached; later occurrences are
	/// leaves.
	pub async fn series_tree(&self, root: Option<i64>) -> BlogResult<Vec<SeriesNode>> {
		let all = sqlx::query_as::<_, Series>(&format!(
			"SELECT {SERIES_COLUMNS} FROM blog_series ORDER BY name ASC"
		))
		.fetch_all(self.db.pool())
		.await?;
		let edges = self.series_parent_edges().await?;

		let mut children: HashMap<Option<i64>, Vec<i64>> = HashMap::new();
		let contained: HashSet<i64> = edges.keys().copied().collect();
		for (child, parents) in &edges {
			for parent in parents {
				children.entry(Some(*parent)).or_default().push(*child);
			}
		}
		for series in all.iter().filter(|s| !contained.contains(&s.id)) {
			children.entry(None).or_default().push(series.id);
		}
		let by_id: HashMap<i64, &Series> = all.iter().map(|s| (s.id, s)).collect();

		let mut path: Vec<i64> = root.into_iter().collect();
		let mut expanded: HashSet<i64> = root.into_iter().collect();
		Ok(series_branch(&children, &by_id, root, &mut path, &mut expanded))
	}
}

/// Every id once, after the series containing it
fn parents_first(
	edges: &HashMap<i64, Vec<i64>>,
	ids: &[i64],
	depth: usize,
	seen: &mut HashSet<i64>,
	out: &mut Vec<i64>,
) {
	if depth > MAX_DEPTH {
		return;
	}
	for id in ids {
		if !seen.insert(*id) {
			continue;
		}
		if let Some(parents) = edges.get(id) {
			parents_first(edges, parents, depth + 1, seen, out);
		}
		out.push(*id);
	}
}

fn series_branch(
	children: &HashMap<Option<i64>, Vec<i64>>,
	by_id: &HashMap<i64, &Series>,
	parent: Option<i64>,
	path: &mut Vec<i64>,
	expanded: &mut HashSet<i64>,
) -> Vec<SeriesNode> {
	if path.len() > MAX_DEPTH {
		return Vec::new();
	}
	let Some(ids) = children.get(&parent) else {
		return Vec::new();
	};
	let mut nodes = Vec::new();
	for id in ids {
		if path.contains(id) {
			continue;
		}
		let Some(series) = by_id.get(id) else {
			continue;
		};
		let kids = if expanded.insert(*id) {
			path.push(*id);
			let kids = series_branch(children, by_id, Some(*id), path, expanded);
			path.pop();
			kids
		} else {
			Vec::new()
		};
		nodes.push(SeriesNode {
			series: (*series).clone(),
			children: kids,
		});
	}
	nodes
}
