//! Redirects from retired page paths

use crate::error::{PageError, PageResult};
use crate::models::{CustomDir, CustomPage, Redirect};
use crate::pages::PAGE_COLUMNS;
use crate::store::{MAX_DEPTH, PageStore, normalize_path};
use chrono::Utc;
use std::collections::HashMap;

const REDIRECT_COLUMNS: &str = "redirectid AS id, realm, oldpath, newpath, same_realm, created";

impl PageStore {
	/// Redirect `old_path` to `new_path` within a realm
	///
	/// Returns `false` when the paths are equal or `old_path` already
	/// redirects somewhere.
	pub async fn create_same_realm_redirect(
		&self,
		old_path: &str,
		new_path: &str,
		realm: &str,
	) -> PageResult<bool> {
		let old_path = normalize_path(old_path);
		let new_path = normalize_path(new_path);
		if old_path.is_empty() || old_path == new_path {
			return Ok(false);
		}
		let result = sqlx::query(
			"INSERT OR IGNORE INTO custom_redirects (realm, oldpath, newpath, same_realm, created)
			 VALUES (?, ?, ?, 1, ?)",
		)
		.bind(realm)
		.bind(&old_path)
		.bind(&new_path)
		.bind(Utc::now())
		.execute(self.db.pool())
		.await?;

		let created = result.rows_affected() > 0;
		if created {
			tracing::info!(realm, old_path = %old_path, new_path = %new_path, "redirect created");
		}
		Ok(created)
	}

	/// Redirect the path `old` had to the path `new` has
	///
	/// No-op across realms or when both resolve to the same path.
	pub async fn create_page_redirect(&self, old: &CustomPage, new: &CustomPage) -> PageResult<bool> {
		if old.realm != new.realm {
			return Ok(false);
		}
		let old_path = self.page_path(old).await?;
		let new_path = self.page_path(new).await?;
		self.create_same_realm_redirect(&old_path, &new_path, &old.realm)
			.await
	}

	/// Redirect every page below `old_dir` to the same relative path below
	/// `new_dir`; returns the number of redirects created
	pub async fn create_dir_redirect(&self, old_dir: i64, new_dir: i64) -> PageResult<usize> {
		let (Some(old), Some(new)) = (self.get_dir(old_dir).await?, self.get_dir(new_dir).await?)
		else {
			return Err(PageError::NotFound(format!("directory {old_dir} or {new_dir}")));
		};
		if old.realm != new.realm || old_dir == new_dir {
			return Ok(0);
		}
		let old_prefix = self.path_from_directory_id(old_dir).await?.join("/");
		let new_prefix = self.path_from_directory_id(new_dir).await?.join("/");

		let mut children: HashMap<i64, Vec<CustomDir>> = HashMap::new();
		for dir in self.realm_dirs(&old.realm).await? {
			if let Some(parent) = dir.parent {
				children.entry(parent).or_default().push(dir);
			}
		}
		let mut pages: HashMap<i64, Vec<CustomPage>> = HashMap::new();
		for page in self.realm_pages(&old.realm).await? {
			if let Some(dir) = page.directory {
				pages.entry(dir).or_default().push(page);
			}
		}

		let mut relative = Vec::new();
		collect_relative(&children, &pages, old_dir, &mut Vec::new(), &mut relative);

		let mut created = 0;
		for rel in relative {
			let from = format!("{old_prefix}/{rel}");
			let to = format!("{new_prefix}/{rel}");
			if self.create_same_realm_redirect(&from, &to, &old.realm).await? {
				created += 1;
			}
		}
		tracing::info!(old_dir, new_dir, created, "directory redirects created");
		Ok(created)
	}

	/// The redirect registered for a path, if any
	pub async fn find_redirect(&self, path: &str, realm: &str) -> PageResult<Option<Redirect>> {
		let redirect = sqlx::query_as::<_, Redirect>(&format!(
			"SELECT {REDIRECT_COLUMNS} FROM custom_redirects WHERE realm = ? AND oldpath = ?"
		))
		.bind(realm)
		.bind(normalize_path(path))
		.fetch_optional(self.db.pool())
		.await?;
		Ok(redirect)
	}

	async fn realm_pages(&self, realm: &str) -> PageResult<Vec<CustomPage>> {
		let pages = sqlx::query_as::<_, CustomPage>(&format!(
			"SELECT {PAGE_COLUMNS} FROM custom_pages WHERE realm = ? ORDER BY url"
		))
		.bind(realm)
		.fetch_all(self.db.pool())
		.await?;
		Ok(pages)
	}
}

/// Paths of every page below `dir`, relative to it
fn collect_relative(
	children: &HashMap<i64, Vec<CustomDir>>,
	pages: &HashMap<i64, Vec<CustomPage>>,
	dir: i64,
	path: &mut Vec<(i64, String)>,
	out: &mut Vec<String>,
) {
	if path.len() > MAX_DEPTH {
		return;
	}
	let prefix: Vec<&str> = path.iter().map(|(_, url)| url.as_str()).collect();
	for page in pages.get(&dir).into_iter().flatten() {
		let mut segments = prefix.clone();
		segments.push(&page.url);
		out.push(segments.join("/"));
	}
	for sub in children.get(&dir).into_iter().flatten() {
		if sub.id == dir || path.iter().any(|(id, _)| *id == sub.id) {
			continue;
		}
		path.push((sub.id, sub.url.clone()));
		collect_relative(children, pages, sub.id, path, out);
		path.pop();
	}
}
