//! Custom directories

use crate::error::{PageError, PageResult};
use crate::models::{CustomDir, DirNode};
use crate::store::{MAX_DEPTH, PageStore, split_path};
use indexmap::IndexMap;
use std::collections::HashMap;

pub(crate) const DIR_COLUMNS: &str = "directoryid AS id, realm, parent, url, active";

/// Reject urls that are empty or would span several segments
pub(crate) fn check_url(url: &str) -> PageResult<&str> {
	let url = url.trim().trim_matches('/');
	if url.is_empty() {
		return Err(PageError::Validation("url must not be empty".to_string()));
	}
	if url.contains('/') {
		return Err(PageError::Validation(format!("url '{url}' must be a single path segment")));
	}
	Ok(url)
}

impl PageStore {
	/// Create a directory under `parent_path` (empty for the realm root)
	pub async fn create_dir(&self, realm: &str, parent_path: &str, url: &str) -> PageResult<CustomDir> {
		let url = check_url(url)?;
		let parent = self.parent_dir_from_str(parent_path, realm).await?;

		let (count,): (i64,) = sqlx::query_as(
			"SELECT COUNT(directoryid) FROM custom_dirs WHERE realm = ? AND parent IS ? AND url = ?",
		)
		.bind(realm)
		.bind(parent)
		.bind(url)
		.fetch_one(self.db.pool())
		.await?;
		if count > 0 {
			return Err(PageError::Collision(format!("directory '{url}' already exists")));
		}

		let dir = sqlx::query_as::<_, CustomDir>(&format!(
			"INSERT INTO custom_dirs (realm, parent, url, active) VALUES (?, ?, ?, 1)
			 RETURNING {DIR_COLUMNS}"
		))
		.bind(realm)
		.bind(parent)
		.bind(url)
		.fetch_one(self.db.pool())
		.await?;

		tracing::info!(realm, directory_id = dir.id, url, "custom directory created");
		Ok(dir)
	}

	pub async fn get_dir(&self, directory_id: i64) -> PageResult<Option<CustomDir>> {
		let dir = sqlx::query_as::<_, CustomDir>(&format!(
			"SELECT {DIR_COLUMNS} FROM custom_dirs WHERE directoryid = ?"
		))
		.bind(directory_id)
		.fetch_optional(self.db.pool())
		.await?;
		Ok(dir)
	}

	/// Resolve directory segments to an id; no segments is the realm root
	pub async fn parent_dir(&self, segments: &[&str], realm: &str) -> PageResult<Option<i64>> {
		let mut parent: Option<i64> = None;
		for segment in segments {
			let found: Option<(i64,)> = sqlx::query_as(
				"SELECT directoryid FROM custom_dirs WHERE realm = ? AND parent IS ? AND url = ?",
			)
			.bind(realm)
			.bind(parent)
			.bind(*segment)
			.fetch_optional(self.db.pool())
			.await?;
			match found {
				Some((id,)) => parent = Some(id),
				None => {
					return Err(PageError::NotFound(format!(
						"directory '{}' in realm {realm}",
						segments.join("/")
					)));
				}
			}
		}
		Ok(parent)
	}

	pub async fn parent_dir_from_str(&self, path: &str, realm: &str) -> PageResult<Option<i64>> {
		self.parent_dir(&split_path(path), realm).await
	}

	/// Segments from the realm root down to the directory itself
	pub async fn path_from_directory_id(&self, directory_id: i64) -> PageResult<Vec<String>> {
		let mut segments = Vec::new();
		let mut current = Some(directory_id);
		while let Some(id) = current {
			if segments.len() > MAX_DEPTH {
				return Err(PageError::Validation(format!(
					"directory {directory_id} is nested too deeply"
				)));
			}
			let Some(dir) = self.get_dir(id).await? else {
				return Err(PageError::NotFound(format!("directory {id}")));
			};
			segments.push(dir.url);
			current = dir.parent;
		}
		segments.reverse();
		Ok(segments)
	}

	/// Directories directly below `dir_path`
	pub async fn list_sub_directories(&self, dir_path: &str, realm: &str) -> PageResult<Vec<CustomDir>> {
		let parent = self.parent_dir_from_str(dir_path, realm).await?;
		let dirs = sqlx::query_as::<_, CustomDir>(&format!(
			"SELECT {DIR_COLUMNS} FROM custom_dirs WHERE realm = ? AND parent IS ? ORDER BY url"
		))
		.bind(realm)
		.bind(parent)
		.fetch_all(self.db.pool())
		.await?;
		Ok(dirs)
	}

	/// Directory trees of several realms, keyed by realm in the given order
	pub async fn custom_dir_tree(
		&self,
		realms: &[String],
		selected: Option<i64>,
	) -> PageResult<IndexMap<String, Vec<DirNode>>> {
		let mut tree = IndexMap::new();
		for realm in realms {
			let children = self.custom_dir_children(realm, None, selected).await?;
			tree.insert(realm.clone(), children);
		}
		Ok(tree)
	}

	/// Nested directories below `directory` (the realm root when `None`)
	pub async fn custom_dir_children(
		&self,
		realm: &str,
		directory: Option<i64>,
		selected: Option<i64>,
	) -> PageResult<Vec<DirNode>> {
		let dirs = self.realm_dirs(realm).await?;
		let mut by_parent: HashMap<Option<i64>, Vec<CustomDir>> = HashMap::new();
		for dir in dirs {
			by_parent.entry(dir.parent).or_default().push(dir);
		}
		let mut path: Vec<i64> = directory.into_iter().collect();
		Ok(dir_branch(&by_parent, directory, selected, &mut path))
	}

	pub(crate) async fn realm_dirs(&self, realm: &str) -> PageResult<Vec<CustomDir>> {
		let dirs = sqlx::query_as::<_, CustomDir>(&format!(
			"SELECT {DIR_COLUMNS} FROM custom_dirs WHERE realm = ? ORDER BY url"
		))
		.bind(realm)
		.fetch_all(self.db.pool())
		.await?;
		Ok(dirs)
	}
}

fn dir_branch(
	by_parent: &HashMap<Option<i64>, Vec<CustomDir>>,
	parent: Option<i64>,
	selected: Option<i64>,
	path: &mut Vec<i64>,
) -> Vec<DirNode> {
	if path.len() > MAX_DEPTH {
		return Vec::new();
	}
	let Some(dirs) = by_parent.get(&parent) else {
		return Vec::new();
	};
	let mut nodes = Vec::with_capacity(dirs.len());
	for dir in dirs {
		if path.contains(&dir.id) {
			continue;
		}
		path.push(dir.id);
		let children = dir_branch(by_parent, Some(dir.id), selected, path);
		path.pop();
		nodes.push(DirNode {
			dir: dir.clone(),
			selected: selected == Some(dir.id),
			children,
		});
	}
	nodes
}
