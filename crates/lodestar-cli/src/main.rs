//! Lodestar command-line tool
//!
//! ## Usage
//!
//! ```bash
//! lodestar serve --config lodestar.toml
//! lodestar migrate
//! lodestar keys
//! ```

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lodestar_conf::Settings;
use lodestar_db::{DatabaseConnection, MigrationExecutor};
use lodestar_server::{AppState, HttpServer, build_router, shutdown_signal};
use lodestar_utils::{FileCache, KeyRing, KeySpec};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Key whose material signs cache file names
const CACHE_KEY: &str = "cache.hash_key";

#[derive(Parser)]
#[command(name = "lodestar")]
#[command(about = "Run and maintain a Lodestar site", long_about = None)]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Settings file (defaults to ./lodestar.toml when present)
	#[arg(short, long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
	/// Apply migrations and serve HTTP until interrupted
	Serve {
		/// Address to bind instead of `server.bind`
		#[arg(long, value_name = "ADDR")]
		bind: Option<String>,
	},

	/// Apply pending migrations
	Migrate {
		/// List pending migrations without applying them
		#[arg(long)]
		dry_run: bool,
	},

	/// Load the keyring, generating missing secret keys
	Keys,
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	let result = match Settings::load(cli.config.as_deref()) {
		Ok(settings) => {
			init_logging(&settings);
			run(cli.command, settings).await
		}
		Err(e) => Err(e.into()),
	};

	if let Err(e) = result {
		eprintln!("Error: {e:#}");
		process::exit(1);
	}
}

async fn run(command: Commands, settings: Settings) -> anyhow::Result<()> {
	match command {
		Commands::Serve { bind } => run_serve(settings, bind).await,
		Commands::Migrate { dry_run } => run_migrate(&settings, dry_run).await,
		Commands::Keys => run_keys(&settings),
	}
}

/// `RUST_LOG` wins over `log.filter`
fn log_filter(settings: &Settings) -> EnvFilter {
	EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&settings.log.filter))
		.unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_logging(settings: &Settings) {
	tracing_subscriber::registry()
		.with(log_filter(settings))
		.with(tracing_subscriber::fmt::layer().with_target(false))
		.init();
}

fn key_specs(settings: &Settings) -> anyhow::Result<Vec<KeySpec>> {
	settings
		.keyring
		.keys
		.iter()
		.map(|key| -> anyhow::Result<KeySpec> {
			let kind = key
				.kind
				.parse()
				.with_context(|| format!("key '{}' has an unknown kind", key.name))?;
			Ok(KeySpec::new(&key.name, &key.file, kind))
		})
		.collect()
}

fn load_keyring(settings: &Settings) -> anyhow::Result<KeyRing> {
	let specs = key_specs(settings)?;
	KeyRing::load_or_generate(&settings.keyring.dir, &specs)
		.with_context(|| format!("loading keyring from {}", settings.keyring.dir.display()))
}

async fn connect(settings: &Settings) -> anyhow::Result<DatabaseConnection> {
	let db = DatabaseConnection::connect(&settings.database.url, settings.database.max_connections)
		.await
		.with_context(|| format!("connecting to {}", settings.database.url))?;
	Ok(db)
}

async fn run_migrate(settings: &Settings, dry_run: bool) -> anyhow::Result<()> {
	let db = connect(settings).await?;
	let executor = MigrationExecutor::new(db.clone());

	if dry_run {
		let pending = executor.pending().await?;
		if pending.is_empty() {
			println!("No pending migrations");
		}
		for name in pending {
			println!("pending: {name}");
		}
	} else {
		let applied = executor.apply_all().await?;
		println!("Applied {} migration(s)", applied.len());
	}
	db.close().await;
	Ok(())
}

fn run_keys(settings: &Settings) -> anyhow::Result<()> {
	let ring = load_keyring(settings)?;
	for key in &settings.keyring.keys {
		match ring.get(&key.name) {
			Some(loaded) => println!("{} ({}, {} bytes)", key.name, loaded.kind(), loaded.material().len()),
			None => println!("{} (missing)", key.name),
		}
	}
	Ok(())
}

async fn run_serve(settings: Settings, bind: Option<String>) -> anyhow::Result<()> {
	let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
	let addr: SocketAddr = bind
		.parse()
		.with_context(|| format!("invalid bind address '{bind}'"))?;

	let ring = load_keyring(&settings)?;
	let cache = match ring.get(CACHE_KEY) {
		Some(key) => Some(FileCache::new(&settings.cache.dir, key.material())),
		None => {
			tracing::warn!(key = CACHE_KEY, "no cache key configured, page caching disabled");
			None
		}
	};

	let db = connect(&settings).await?;
	let applied = MigrationExecutor::new(db.clone()).apply_all().await?;
	if !applied.is_empty() {
		tracing::info!(count = applied.len(), "database migrated");
	}

	let state = Arc::new(AppState::new(db.clone(), &settings, cache));
	let router = build_router(state);
	HttpServer::new(Arc::new(router))
		.with_max_body_size(settings.server.max_body_size)
		.listen(addr, shutdown_signal())
		.await
		.with_context(|| format!("serving on {addr}"))?;

	db.close().await;
	tracing::info!("server stopped");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use lodestar_conf::KeySetting;
	use rstest::rstest;

	#[rstest]
	#[case(&["lodestar", "keys"], Commands::Keys)]
	#[case(&["lodestar", "migrate", "--dry-run"], Commands::Migrate { dry_run: true })]
	#[case(&["lodestar", "serve", "--bind", "0.0.0.0:80"], Commands::Serve { bind: Some("0.0.0.0:80".to_string()) })]
	fn test_parse_commands(#[case] args: &[&str], #[case] expected: Commands) {
		let cli = Cli::try_parse_from(args).unwrap();
		assert_eq!(cli.command, expected);
		assert!(cli.config.is_none());
	}

	#[rstest]
	fn test_config_flag_after_subcommand() {
		let cli = Cli::try_parse_from(["lodestar", "serve", "--config", "site.toml"]).unwrap();
		assert_eq!(cli.config, Some(PathBuf::from("site.toml")));
	}

	#[rstest]
	fn test_unknown_key_kind_rejected() {
		// Arrange
		let mut settings = Settings::default();
		settings.keyring.keys.push(KeySetting {
			name: "odd".to_string(),
			file: "odd.key".to_string(),
			kind: "Telepathy".to_string(),
		});

		// Act
		let result = key_specs(&settings);

		// Assert
		let message = format!("{:#}", result.unwrap_err());
		assert!(message.contains("key 'odd' has an unknown kind"));
	}

	#[rstest]
	fn test_keyring_generated_under_configured_dir() {
		// Arrange
		let dir = tempfile::tempdir().unwrap();
		let mut settings = Settings::default();
		settings.keyring.dir = dir.path().join("keyring");

		// Act
		let ring = load_keyring(&settings).unwrap();

		// Assert
		assert_eq!(ring.get(CACHE_KEY).unwrap().material().len(), 32);
		assert!(dir.path().join("keyring/cache_hash.key").exists());
	}

	#[rstest]
	#[tokio::test]
	async fn test_migrate_in_memory() {
		let mut settings = Settings::default();
		settings.database.url = "sqlite::memory:".to_string();

		run_migrate(&settings, false).await.unwrap();
	}
}
