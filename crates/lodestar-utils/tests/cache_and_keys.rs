//! File cache and keyring against a temporary directory

use lodestar_utils::{FileCache, KeyKind, KeyRing, KeySpec, UtilsError};
use rstest::*;
use tempfile::TempDir;

#[fixture]
fn dir() -> TempDir {
	tempfile::tempdir().unwrap()
}

#[rstest]
#[tokio::test]
async fn test_set_get_delete(dir: TempDir) {
	// Arrange
	let cache = FileCache::new(dir.path(), b"0123456789abcdef0123456789abcdef".to_vec());

	// Act
	cache.set("page:/about", "<p>about</p>").await.unwrap();
	let hit = cache.get("page:/about").await.unwrap();
	let removed = cache.delete("page:/about").await.unwrap();
	let miss = cache.get("page:/about").await.unwrap();

	// Assert
	assert_eq!(hit.as_deref(), Some(&b"<p>about</p>"[..]));
	assert!(removed);
	assert!(miss.is_none());
	assert!(!cache.delete("page:/about").await.unwrap());
}

#[rstest]
#[tokio::test]
async fn test_entries_use_two_lookup_directories(dir: TempDir) {
	// Arrange
	let cache = FileCache::new(dir.path(), vec![9u8; 32]);
	let pre_hash = format!("{}/{}", dir.path().display(), "k");
	let [a, b, rest] = cache.relative_hash(&pre_hash).unwrap();

	// Act
	cache.set("k", "v").await.unwrap();

	// Assert
	assert!(dir.path().join(a).join(b).join(rest).is_file());
}

#[rstest]
#[tokio::test]
async fn test_purge_keeps_non_entry_files(dir: TempDir) {
	// Arrange
	let cache = FileCache::new(dir.path(), vec![3u8; 32]);
	for key in ["a", "b", "c"] {
		cache.set(key, key).await.unwrap();
	}
	std::fs::write(dir.path().join(".gitignore"), "*").unwrap();

	// Act
	let removed = cache.purge().await.unwrap();

	// Assert
	assert_eq!(removed, 3);
	assert!(cache.get("a").await.unwrap().is_none());
	assert!(dir.path().join(".gitignore").exists());
}

#[rstest]
#[tokio::test]
async fn test_purge_missing_directory_is_empty() {
	let cache = FileCache::new("/nonexistent/lodestar/cache", vec![1u8; 32]);
	assert_eq!(cache.purge().await.unwrap(), 0);
}

#[rstest]
fn test_keyring_generates_then_reloads(dir: TempDir) {
	// Arrange
	let specs = vec![
		KeySpec::new("cache.hash_key", "cache_hash.key", KeyKind::AuthenticationKey),
		KeySpec::new("notary.key", "notary.key", KeyKind::EncryptionKey),
	];

	// Act
	let first = KeyRing::load_or_generate(dir.path(), &specs).unwrap();
	let second = KeyRing::load_or_generate(dir.path(), &specs).unwrap();

	// Assert
	let key = first.get("cache.hash_key").unwrap();
	assert_eq!(key.material().len(), 32);
	assert_eq!(key.kind(), KeyKind::AuthenticationKey);
	assert_eq!(second.get("cache.hash_key"), Some(key));
	assert_eq!(second.len(), 2);
}

#[cfg(unix)]
#[rstest]
fn test_generated_key_is_private(dir: TempDir) {
	use std::os::unix::fs::PermissionsExt;

	let specs = vec![KeySpec::new("k", "k.key", KeyKind::EncryptionKey)];
	KeyRing::load_or_generate(dir.path(), &specs).unwrap();

	let mode = std::fs::metadata(dir.path().join("k.key")).unwrap().permissions().mode();
	assert_eq!(mode & 0o777, 0o600);
}

#[rstest]
fn test_missing_public_key_is_an_error(dir: TempDir) {
	let specs = vec![KeySpec::new(
		"update.verify",
		"update_verify.key",
		KeyKind::SignaturePublicKey,
	)];

	let result = KeyRing::load_or_generate(dir.path(), &specs);

	assert!(matches!(result, Err(UtilsError::MissingKey(name)) if name == "update.verify"));
}

#[rstest]
fn test_corrupt_key_file_reports_name(dir: TempDir) {
	std::fs::write(dir.path().join("bad.key"), "not-hex").unwrap();
	let specs = vec![KeySpec::new("bad", "bad.key", KeyKind::AuthenticationKey)];

	let result = KeyRing::load_or_generate(dir.path(), &specs);

	assert!(matches!(result, Err(UtilsError::KeyEncoding { name, .. }) if name == "bad"));
}
