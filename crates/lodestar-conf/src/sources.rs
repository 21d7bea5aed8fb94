//! Configuration sources for the layered settings system
//!
//! Sources are merged in priority order
//! (environment variables > config files > defaults).

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync {
	/// Load configuration from this source
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// Error type for configuration sources
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Missing required source: {0}")]
	Missing(String),
}

/// Environment variable configuration source
///
/// Keys are lowercased after the prefix is stripped, and `__` separates
/// nested keys: `LODESTAR_DATABASE__URL` becomes `database.url`.
pub struct EnvSource {
	prefix: String,
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	/// Create a new environment variable source with the given prefix
	///
	/// # Examples
	///
	/// ```
	/// use lodestar_conf::sources::EnvSource;
	///
	/// let source = EnvSource::new("LODESTAR_");
	/// ```
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			vars: None,
		}
	}

	/// Read from a fixed set of variables instead of the process environment
	///
	/// # Examples
	///
	/// ```
	/// use lodestar_conf::sources::{ConfigSource, EnvSource};
	///
	/// let source = EnvSource::new("APP_")
	///     .with_vars(vec![("APP_SERVER__BIND".to_string(), "0.0.0.0:80".to_string())]);
	/// let loaded = source.load().unwrap();
	/// assert_eq!(loaded["server"]["bind"], "0.0.0.0:80");
	/// ```
	pub fn with_vars(mut self, vars: Vec<(String, String)>) -> Self {
		self.vars = Some(vars);
		self
	}

	fn parse_scalar(value: &str) -> Value {
		let trimmed = value.trim();
		match trimmed.to_lowercase().as_str() {
			"true" | "yes" | "on" => return Value::Bool(true),
			"false" | "no" | "off" => return Value::Bool(false),
			_ => {}
		}
		if let Ok(num) = trimmed.parse::<i64>() {
			return Value::Number(num.into());
		}
		Value::String(value.to_string())
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let vars: Vec<(String, String)> = match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		};

		let mut root = Map::new();
		for (key, value) in vars {
			let Some(stripped) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			let path: Vec<String> = stripped
				.split("__")
				.filter(|s| !s.is_empty())
				.map(str::to_lowercase)
				.collect();
			if path.is_empty() {
				continue;
			}
			insert_path(&mut root, &path, Self::parse_scalar(&value));
		}

		Ok(root.into_iter().collect())
	}

	fn priority(&self) -> u8 {
		100 // Highest priority
	}

	fn description(&self) -> String {
		format!("Environment variables (prefix: {})", self.prefix)
	}
}

fn insert_path(map: &mut Map<String, Value>, path: &[String], value: Value) {
	let (head, rest) = match path.split_first() {
		Some(split) => split,
		None => return,
	};
	if rest.is_empty() {
		map.insert(head.clone(), value);
		return;
	}
	let entry = map
		.entry(head.clone())
		.or_insert_with(|| Value::Object(Map::new()));
	if !entry.is_object() {
		*entry = Value::Object(Map::new());
	}
	if let Value::Object(child) = entry {
		insert_path(child, rest, value);
	}
}

/// TOML file configuration source
pub struct TomlFileSource {
	path: PathBuf,
	required: bool,
}

impl TomlFileSource {
	/// Create a new TOML file configuration source
	///
	/// A missing file yields no values unless the source is marked required.
	///
	/// # Examples
	///
	/// ```
	/// use lodestar_conf::sources::TomlFileSource;
	/// use std::path::PathBuf;
	///
	/// let source = TomlFileSource::new(PathBuf::from("lodestar.toml"));
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}

	/// Fail loading when the file does not exist
	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		if !self.path.exists() {
			if self.required {
				return Err(SourceError::Missing(self.path.display().to_string()));
			}
			return Ok(IndexMap::new());
		}

		let content = fs::read_to_string(&self.path)?;
		let toml_value: toml::Value = toml::from_str(&content)?;

		// Convert TOML value to JSON value
		let json_value = serde_json::to_value(&toml_value)?;

		let map = json_value
			.as_object()
			.ok_or_else(|| SourceError::Parse("Expected table at root".to_string()))?;

		Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
	}

	fn priority(&self) -> u8 {
		50 // Medium priority
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Default values configuration source
pub struct DefaultSource {
	values: IndexMap<String, Value>,
}

impl DefaultSource {
	/// Create an empty default values source
	pub fn new() -> Self {
		Self {
			values: IndexMap::new(),
		}
	}

	/// Add a default value
	///
	/// # Examples
	///
	/// ```
	/// use lodestar_conf::sources::{ConfigSource, DefaultSource};
	/// use serde_json::json;
	///
	/// let source = DefaultSource::new().with_value("realms", json!(["admin"]));
	/// assert_eq!(source.load().unwrap()["realms"], json!(["admin"]));
	/// ```
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}

	/// Build a source from a serialisable value whose root is an object
	pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self, SourceError> {
		let json = serde_json::to_value(value)?;
		match json {
			Value::Object(map) => Ok(Self {
				values: map.into_iter().collect(),
			}),
			_ => Err(SourceError::Parse(
				"Default values must serialise to an object".to_string(),
			)),
		}
	}
}

impl Default for DefaultSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		0 // Lowest priority
	}

	fn description(&self) -> String {
		"Default values".to_string()
	}
}
