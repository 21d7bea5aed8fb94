//! Resolving request paths to custom pages

use crate::error::{PageError, PageResult};
use crate::models::{CustomPage, PageVersion, Served};
use crate::render::render;
use crate::store::{PageStore, normalize_path, split_path};

impl PageStore {
	/// Resolve `path` in `realm` to a published page, a redirect, or nothing
	///
	/// Pages flagged `cache` are rendered once and then read from the file
	/// cache until it is cleared.
	pub async fn serve(&self, realm: &str, path: &str) -> PageResult<Served> {
		let segments = split_path(path);
		if let Some((file, dirs)) = segments.split_last() {
			let directory = match self.parent_dir(dirs, realm).await {
				Ok(directory) => Some(directory),
				Err(PageError::NotFound(_)) => None,
				Err(e) => return Err(e),
			};
			if let Some(directory) = directory
				&& let Some(page) = self.get_page(file, directory, realm).await?
				&& let Some(version) = self.latest_version(page.id).await?
			{
				let html = self.rendered(realm, &page, &version).await?;
				return Ok(Served::Page {
					page,
					version,
					html,
				});
			}
		}

		if let Some(redirect) = self.find_redirect(path, realm).await? {
			tracing::debug!(realm, path, target = %redirect.newpath, "serving redirect");
			return Ok(Served::Redirect(redirect));
		}
		tracing::debug!(realm, path, "custom page not found");
		Ok(Served::NotFound)
	}

	async fn rendered(&self, realm: &str, page: &CustomPage, version: &PageVersion) -> PageResult<String> {
		let cache = self.cache.as_ref().filter(|_| page.cache);
		let key = format!("{realm}/{}", normalize_path(&self.page_path(page).await?));

		if let Some(cache) = cache
			&& let Some(bytes) = cache.get(&key).await?
		{
			return Ok(String::from_utf8_lossy(&bytes).into_owned());
		}

		let html = render(&version.formatting, &version.body, version.raw);
		if let Some(cache) = cache
			&& let Err(e) = cache.set(&key, &html).await
		{
			tracing::warn!(page_id = page.id, error = %e, "failed to cache rendered page");
		}
		Ok(html)
	}
}
