//! Named secret keys stored as hex files
//!
//! Secret keys (authentication, encryption) are generated on first use and
//! written next to each other in the keyring directory. Public keys are
//! provisioned out of band and only ever loaded.

use crate::error::{UtilsError, UtilsResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Length of generated secret keys in bytes
pub const SECRET_KEY_BYTES: usize = 32;

/// The role a key plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
	AuthenticationKey,
	EncryptionKey,
	SignaturePublicKey,
	EncryptionPublicKey,
}

impl KeyKind {
	/// Whether a missing key of this kind may be generated locally
	pub fn is_generated(self) -> bool {
		matches!(self, KeyKind::AuthenticationKey | KeyKind::EncryptionKey)
	}
}

impl FromStr for KeyKind {
	type Err = UtilsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"AuthenticationKey" => Ok(KeyKind::AuthenticationKey),
			"EncryptionKey" => Ok(KeyKind::EncryptionKey),
			"SignaturePublicKey" => Ok(KeyKind::SignaturePublicKey),
			"EncryptionPublicKey" => Ok(KeyKind::EncryptionPublicKey),
			other => Err(UtilsError::UnknownKeyKind(other.to_string())),
		}
	}
}

impl fmt::Display for KeyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			KeyKind::AuthenticationKey => "AuthenticationKey",
			KeyKind::EncryptionKey => "EncryptionKey",
			KeyKind::SignaturePublicKey => "SignaturePublicKey",
			KeyKind::EncryptionPublicKey => "EncryptionPublicKey",
		};
		f.write_str(name)
	}
}

/// Where a key lives and what it is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
	pub name: String,
	pub file: String,
	pub kind: KeyKind,
}

impl KeySpec {
	pub fn new(name: impl Into<String>, file: impl Into<String>, kind: KeyKind) -> Self {
		Self {
			name: name.into(),
			file: file.into(),
			kind,
		}
	}
}

/// Raw key material
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
	kind: KeyKind,
	material: Vec<u8>,
}

impl Key {
	pub fn kind(&self) -> KeyKind {
		self.kind
	}

	pub fn material(&self) -> &[u8] {
		&self.material
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Key")
			.field("kind", &self.kind)
			.field("material", &"<redacted>")
			.finish()
	}
}

/// Loaded keys by name
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
	keys: HashMap<String, Key>,
}

impl KeyRing {
	/// Load every key in `specs` from `dir`, generating missing secret keys
	pub fn load_or_generate(dir: &Path, specs: &[KeySpec]) -> UtilsResult<Self> {
		fs::create_dir_all(dir)?;

		let mut keys = HashMap::with_capacity(specs.len());
		for spec in specs {
			let path = dir.join(&spec.file);
			let key = if path.exists() {
				let encoded = fs::read_to_string(&path)?;
				let material =
					hex::decode(encoded.trim()).map_err(|source| UtilsError::KeyEncoding {
						name: spec.name.clone(),
						source,
					})?;
				Key {
					kind: spec.kind,
					material,
				}
			} else if spec.kind.is_generated() {
				let key = generate(spec.kind);
				write_secret(&path, &hex::encode(&key.material))?;
				tracing::info!(key = %spec.name, kind = %spec.kind, "generated new key");
				key
			} else {
				return Err(UtilsError::MissingKey(spec.name.clone()));
			};
			keys.insert(spec.name.clone(), key);
		}

		Ok(Self { keys })
	}

	pub fn get(&self, name: &str) -> Option<&Key> {
		self.keys.get(name)
	}

	/// Add a key directly, replacing any key with the same name
	pub fn insert(&mut self, name: impl Into<String>, key: Key) {
		self.keys.insert(name.into(), key);
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.keys.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}

/// Fresh random key material of `kind`
pub fn generate(kind: KeyKind) -> Key {
	let mut material = vec![0u8; SECRET_KEY_BYTES];
	rand::thread_rng().fill_bytes(&mut material);
	Key { kind, material }
}

fn write_secret(path: &Path, encoded: &str) -> UtilsResult<()> {
	fs::write(path, encoded)?;
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(KeyKind::AuthenticationKey)]
	#[case(KeyKind::EncryptionKey)]
	#[case(KeyKind::SignaturePublicKey)]
	#[case(KeyKind::EncryptionPublicKey)]
	fn test_kind_display_parses_back(#[case] kind: KeyKind) {
		assert_eq!(kind.to_string().parse::<KeyKind>().unwrap(), kind);
	}

	#[test]
	fn test_unknown_kind() {
		assert!(matches!(
			"SymmetricKey".parse::<KeyKind>(),
			Err(UtilsError::UnknownKeyKind(_))
		));
	}

	#[test]
	fn test_debug_redacts_material() {
		let key = generate(KeyKind::EncryptionKey);
		assert!(!format!("{key:?}").contains(&format!("{:?}", key.material())));
	}
}
