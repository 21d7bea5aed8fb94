//! Keyed file cache
//!
//! Entries live at `base/hh/hh/hhhh…`, the hex of an HMAC-SHA256 of
//! `base/key` under a per-deployment secret, split after the first and
//! second byte.

use crate::error::{UtilsError, UtilsResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

type HmacSha256 = Hmac<Sha256>;

/// File-backed cache rooted at one directory
#[derive(Debug, Clone)]
pub struct FileCache {
	base_dir: PathBuf,
	hash_key: Vec<u8>,
}

impl FileCache {
	/// Create a cache in `base_dir` keyed with `hash_key`
	pub fn new(base_dir: impl Into<PathBuf>, hash_key: impl Into<Vec<u8>>) -> Self {
		Self {
			base_dir: base_dir.into(),
			hash_key: hash_key.into(),
		}
	}

	pub fn base_dir(&self) -> &Path {
		&self.base_dir
	}

	/// The three path components for `pre_hash`: first byte, second byte
	/// and the rest, each lowercase hex
	pub fn relative_hash(&self, pre_hash: &str) -> UtilsResult<[String; 3]> {
		let mut mac =
			HmacSha256::new_from_slice(&self.hash_key).map_err(|_| UtilsError::InvalidCacheKey)?;
		mac.update(pre_hash.as_bytes());
		let digest = mac.finalize().into_bytes();

		Ok([
			hex::encode(&digest[..1]),
			hex::encode(&digest[1..2]),
			hex::encode(&digest[2..]),
		])
	}

	fn entry_path(&self, key: &str) -> UtilsResult<PathBuf> {
		let pre_hash = format!("{}/{}", self.base_dir.display(), key);
		let [first, second, rest] = self.relative_hash(&pre_hash)?;
		Ok(self.base_dir.join(first).join(second).join(rest))
	}

	/// Read an entry, `None` when absent
	pub async fn get(&self, key: &str) -> UtilsResult<Option<Vec<u8>>> {
		let path = self.entry_path(key)?;
		match fs::read(&path).await {
			Ok(data) => Ok(Some(data)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	/// Store an entry, creating both lookup directories
	pub async fn set(&self, key: &str, value: impl AsRef<[u8]>) -> UtilsResult<()> {
		let path = self.entry_path(key)?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await?;
		}
		fs::write(&path, value.as_ref()).await?;
		tracing::trace!(key, "cache entry stored");
		Ok(())
	}

	/// Remove an entry; returns whether one existed
	pub async fn delete(&self, key: &str) -> UtilsResult<bool> {
		let path = self.entry_path(key)?;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(true),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
			Err(e) => Err(e.into()),
		}
	}

	/// Delete every cache entry file under the base directory
	///
	/// Only files whose names are lowercase hex are removed. Returns the
	/// number of files deleted.
	pub async fn purge(&self) -> UtilsResult<usize> {
		let mut removed = 0;
		let mut pending = vec![self.base_dir.clone()];

		while let Some(dir) = pending.pop() {
			let mut entries = match fs::read_dir(&dir).await {
				Ok(entries) => entries,
				Err(e) if e.kind() == ErrorKind::NotFound => continue,
				Err(e) => return Err(e.into()),
			};
			while let Some(entry) = entries.next_entry().await? {
				let file_type = entry.file_type().await?;
				if file_type.is_dir() {
					pending.push(entry.path());
				} else if file_type.is_file()
					&& entry.file_name().to_str().is_some_and(is_lower_hex)
				{
					fs::remove_file(entry.path()).await?;
					removed += 1;
				}
			}
		}

		tracing::debug!(dir = %self.base_dir.display(), removed, "cache purged");
		Ok(removed)
	}
}

fn is_lower_hex(name: &str) -> bool {
	!name.is_empty() && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
