//! # Lodestar Pages
//!
//! Custom pages: per-realm directory trees, versioned page bodies,
//! redirects from retired paths and rendering of the published version.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lodestar_db::{DatabaseConnection, MigrationExecutor};
//! use lodestar_pages::{NewPage, PageStore, Served};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::connect("sqlite::memory:", 1).await?;
//! MigrationExecutor::new(db.clone()).apply_all().await?;
//!
//! let pages = PageStore::new(db);
//! pages.create_dir("public", "", "docs").await?;
//! let page = NewPage {
//!     url: "install".to_string(),
//!     cache: false,
//!     formatting: "Markdown".to_string(),
//!     metadata: serde_json::json!({}),
//!     body: "# Installing".to_string(),
//! };
//! pages.create_page("public", "docs", &page, true, false, None).await?;
//!
//! assert!(matches!(pages.serve("public", "/docs/install").await?, Served::Page { .. }));
//! # Ok(())
//! # }
//! ```

pub mod dirs;
pub mod error;
pub mod models;
pub mod pages;
pub mod redirects;
pub mod render;
pub mod serve;
pub mod store;
pub mod versions;

pub use error::{PageError, PageResult};
pub use models::{CustomDir, CustomPage, DirNode, NewPage, PageUpdate, PageVersion, Redirect, Served};
pub use render::{Formatting, render};
pub use store::{PageStore, normalize_path, split_path};
