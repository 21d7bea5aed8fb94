//! Row types and inputs for custom pages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomDir {
	pub id: i64,
	pub realm: String,
	pub parent: Option<i64>,
	pub url: String,
	pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomPage {
	pub id: i64,
	pub realm: String,
	pub directory: Option<i64>,
	pub url: String,
	/// Set once any version is published
	pub active: bool,
	/// Rendered output may be kept in the file cache
	pub cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageVersion {
	pub id: i64,
	pub page: i64,
	pub uniqueid: String,
	pub published: bool,
	/// Raw versions skip HTML purification
	pub raw: bool,
	pub formatting: String,
	pub editor: Option<i64>,
	/// JSON object as stored
	pub metadata: String,
	pub body: String,
	pub created: DateTime<Utc>,
}

impl PageVersion {
	/// Stored metadata, or an empty object when it isn't valid JSON
	pub fn metadata_value(&self) -> Value {
		serde_json::from_str(&self.metadata).unwrap_or_else(|e| {
			tracing::warn!(version_id = self.id, error = %e, "unreadable page metadata");
			Value::Object(Default::default())
		})
	}
}

fn default_formatting() -> String {
	"HTML".to_string()
}

/// Input for [`crate::PageStore::create_page`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPage {
	pub url: String,
	#[serde(default)]
	pub cache: bool,
	#[serde(default = "default_formatting")]
	pub formatting: String,
	#[serde(default)]
	pub metadata: Value,
	#[serde(default)]
	pub body: String,
}

/// Desired state of a page's content for [`crate::PageStore::update_page`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUpdate {
	#[serde(default = "default_formatting")]
	pub formatting: String,
	#[serde(default)]
	pub metadata: Value,
	#[serde(default)]
	pub body: String,
}

/// Directory with its nested children, as shown in directory pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirNode {
	#[serde(flatten)]
	pub dir: CustomDir,
	pub selected: bool,
	pub children: Vec<DirNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Redirect {
	pub id: i64,
	pub realm: String,
	pub oldpath: String,
	pub newpath: String,
	/// `newpath` is a path in the same realm rather than an absolute URL
	pub same_realm: bool,
	pub created: DateTime<Utc>,
}

/// Outcome of resolving a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
	Page {
		page: CustomPage,
		version: PageVersion,
		html: String,
	},
	Redirect(Redirect),
	NotFound,
}

/// Metadata as stored: objects verbatim, anything else as `{}`
pub(crate) fn metadata_json(metadata: &Value) -> Result<String, serde_json::Error> {
	match metadata {
		Value::Object(_) => serde_json::to_string(metadata),
		_ => Ok("{}".to_string()),
	}
}
