//! # Lodestar Conf
//!
//! Layered settings for Lodestar.
//!
//! Values are merged from several [`sources::ConfigSource`]s in priority
//! order and deserialised into [`Settings`]:
//!
//! 1. built-in defaults
//! 2. a TOML file (`lodestar.toml` unless another path is given)
//! 3. `LODESTAR_*` environment variables, `__` separating nested keys
//!
//! ## Example
//!
//! ```rust
//! use lodestar_conf::{Settings, SettingsBuilder};
//! use lodestar_conf::sources::{DefaultSource, EnvSource};
//!
//! let defaults = DefaultSource::from_serialize(&Settings::default()).unwrap();
//! let settings = SettingsBuilder::new()
//!     .add_source(defaults)
//!     .add_source(EnvSource::new("DOCS_").with_vars(vec![
//!         ("DOCS_DATABASE__URL".to_string(), "sqlite::memory:".to_string()),
//!     ]))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(settings.database.url, "sqlite::memory:");
//! ```

pub mod settings;
pub mod sources;

pub use settings::{
	CacheSettings, ConfigError, DatabaseSettings, ENV_PREFIX, KeySetting, KeyringSettings,
	LogSettings, ServerSettings, Settings, SettingsBuilder,
};
