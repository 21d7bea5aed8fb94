//! Typed settings and the layered builder that produces them

use crate::sources::{ConfigSource, DefaultSource, EnvSource, SourceError, TomlFileSource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment variable prefix used by [`Settings::load`]
pub const ENV_PREFIX: &str = "LODESTAR_";

/// Settings errors
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Failed to load {source_name}: {error}")]
	Source {
		source_name: String,
		#[source]
		error: SourceError,
	},

	#[error("Invalid settings: {0}")]
	Deserialize(#[from] serde_json::Error),

	#[error("Validation failed: {0}")]
	Validation(String),
}

/// Database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
	pub url: String,
	pub max_connections: u32,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
	pub bind: String,
	/// Largest accepted request body in bytes
	pub max_body_size: usize,
}

/// File cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
	pub dir: PathBuf,
}

/// One key of the keyring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySetting {
	pub name: String,
	pub file: String,
	pub kind: String,
}

/// Keyring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyringSettings {
	pub dir: PathBuf,
	pub keys: Vec<KeySetting>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
	/// Default `tracing-subscriber` filter directive
	pub filter: String,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
	pub database: DatabaseSettings,
	pub server: ServerSettings,
	pub cache: CacheSettings,
	pub keyring: KeyringSettings,
	/// Every realm the site routes
	pub realms: Vec<String>,
	/// Realm whose custom pages are served at the site root
	pub public_realm: String,
	/// Realm whose permissions govern blog management
	pub admin_realm: String,
	pub log: LogSettings,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			database: DatabaseSettings {
				url: "sqlite://lodestar.db".to_string(),
				max_connections: 5,
			},
			server: ServerSettings {
				bind: "127.0.0.1:8080".to_string(),
				max_body_size: 10 * 1024 * 1024,
			},
			cache: CacheSettings {
				dir: PathBuf::from("tmp/cache"),
			},
			keyring: KeyringSettings {
				dir: PathBuf::from("config/keyring"),
				keys: vec![KeySetting {
					name: "cache.hash_key".to_string(),
					file: "cache_hash.key".to_string(),
					kind: "AuthenticationKey".to_string(),
				}],
			},
			realms: vec!["admin".to_string(), "public".to_string()],
			public_realm: "public".to_string(),
			admin_realm: "admin".to_string(),
			log: LogSettings {
				filter: "info".to_string(),
			},
		}
	}
}

impl Settings {
	/// Load settings from defaults, an optional TOML file and `LODESTAR_*`
	/// environment variables
	pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
		let defaults = DefaultSource::from_serialize(&Settings::default()).map_err(|error| {
			ConfigError::Source {
				source_name: "Default values".to_string(),
				error,
			}
		})?;

		let mut builder = SettingsBuilder::new().add_source(defaults);
		builder = match config_file {
			Some(path) => builder.add_source(TomlFileSource::new(path).required()),
			None => builder.add_source(TomlFileSource::new("lodestar.toml")),
		};
		builder.add_source(EnvSource::new(ENV_PREFIX)).build()
	}

	/// Check cross-field constraints
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.realms.is_empty() {
			return Err(ConfigError::Validation(
				"at least one realm must be configured".to_string(),
			));
		}
		if !self.realms.contains(&self.public_realm) {
			return Err(ConfigError::Validation(format!(
				"public realm '{}' is not one of the configured realms",
				self.public_realm
			)));
		}
		if !self.realms.contains(&self.admin_realm) {
			return Err(ConfigError::Validation(format!(
				"admin realm '{}' is not one of the configured realms",
				self.admin_realm
			)));
		}
		if self.server.max_body_size == 0 {
			return Err(ConfigError::Validation(
				"server.max_body_size must be at least 1".to_string(),
			));
		}
		if self.database.max_connections == 0 {
			return Err(ConfigError::Validation(
				"database.max_connections must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}

/// Builder merging configuration sources by priority
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	/// Create a builder with no sources
	pub fn new() -> Self {
		Self {
			sources: Vec::new(),
		}
	}

	/// Add a configuration source
	pub fn add_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Merge every source into a single JSON object
	///
	/// Sources are applied in ascending priority, so later layers override
	/// earlier ones key by key.
	pub fn merged(mut self) -> Result<Value, ConfigError> {
		self.sources.sort_by_key(|s| s.priority());

		let mut merged = Value::Object(Map::new());
		for source in &self.sources {
			let values = source.load().map_err(|error| ConfigError::Source {
				source_name: source.description(),
				error,
			})?;
			tracing::debug!(source = %source.description(), keys = values.len(), "loaded settings source");
			let layer = Value::Object(values.into_iter().collect());
			merge_values(&mut merged, layer);
		}
		Ok(merged)
	}

	/// Merge and deserialise into [`Settings`], then validate
	pub fn build(self) -> Result<Settings, ConfigError> {
		let merged = self.merged()?;
		let settings: Settings = serde_json::from_value(merged)?;
		settings.validate()?;
		Ok(settings)
	}
}

impl Default for SettingsBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Deep-merge `layer` into `base`: objects merge recursively, anything else
/// replaces
pub fn merge_values(base: &mut Value, layer: Value) {
	match (base, layer) {
		(Value::Object(base_map), Value::Object(layer_map)) => {
			for (key, value) in layer_map {
				match base_map.get_mut(&key) {
					Some(existing) => merge_values(existing, value),
					None => {
						base_map.insert(key, value);
					}
				}
			}
		}
		(base, layer) => *base = layer,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_merge_values_nested_override() {
		let mut base = json!({"database": {"url": "a", "max_connections": 5}, "realms": ["x"]});
		merge_values(
			&mut base,
			json!({"database": {"url": "b"}, "realms": ["y", "z"]}),
		);

		assert_eq!(
			base,
			json!({"database": {"url": "b", "max_connections": 5}, "realms": ["y", "z"]})
		);
	}

	#[test]
	fn test_default_settings_validate() {
		assert!(Settings::default().validate().is_ok());
	}

	#[test]
	fn test_public_realm_must_be_listed() {
		let settings = Settings {
			public_realm: "elsewhere".to_string(),
			..Settings::default()
		};
		assert!(matches!(
			settings.validate(),
			Err(ConfigError::Validation(_))
		));
	}
}
