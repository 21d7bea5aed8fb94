//! # Lodestar Utils
//!
//! Small building blocks shared by the other Lodestar crates:
//!
//! - [`cache`]: keyed file cache with a hashed directory layout
//! - [`keyring`]: named secret keys stored as hex files
//! - [`html`]: escaping and purification of stored markup
//! - [`unique_id`]: random identifiers for versions and short URLs

pub mod cache;
pub mod error;
pub mod html;
pub mod keyring;
pub mod unique_id;

pub use cache::FileCache;
pub use error::{UtilsError, UtilsResult};
pub use keyring::{Key, KeyKind, KeyRing, KeySpec};
