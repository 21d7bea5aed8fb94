//! Row types and inputs for the blog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
	pub id: i64,
	pub name: String,
	pub slug: String,
	pub byline: String,
	pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
	pub id: i64,
	pub parent: Option<i64>,
	pub name: String,
	pub slug: String,
	pub preamble: String,
	pub created: DateTime<Utc>,
}

/// Category with its nested children
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
	#[serde(flatten)]
	pub category: Category,
	/// Ids from the root down to the parent
	pub ancestors: Vec<i64>,
	pub children: Vec<CategoryNode>,
}

/// New values for a category; a parent of `None` or `<= 0` detaches it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUpdate {
	pub name: Option<String>,
	pub preamble: Option<String>,
	pub parent: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
	pub id: i64,
	pub name: String,
	pub slug: String,
	pub created: DateTime<Utc>,
}

/// Sort column for tag listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSort {
	#[default]
	Name,
	Created,
}

impl TagSort {
	pub(crate) fn column(self) -> &'static str {
		match self {
			TagSort::Name => "name",
			TagSort::Created => "created",
		}
	}
}

impl FromStr for TagSort {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"name" => Ok(TagSort::Name),
			"created" => Ok(TagSort::Created),
			other => Err(format!("unknown tag sort '{other}'")),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
	pub id: i64,
	pub author: i64,
	pub category: Option<i64>,
	pub title: String,
	pub slug: String,
	pub description: String,
	pub format: String,
	pub shorturl: String,
	/// Published flag
	pub status: bool,
	pub created: DateTime<Utc>,
	pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostVersion {
	pub id: i64,
	pub post: i64,
	pub body: String,
	pub format: String,
	pub live: bool,
	pub published_by: Option<i64>,
	pub created: DateTime<Utc>,
}

fn default_format() -> String {
	"HTML".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
	pub author: i64,
	#[serde(default)]
	pub category: Option<i64>,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default = "default_format")]
	pub format: String,
	pub body: String,
	#[serde(default)]
	pub tags: Vec<i64>,
}

/// Submitted state of an existing post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostUpdate {
	#[serde(default)]
	pub author: Option<i64>,
	#[serde(default)]
	pub category: Option<i64>,
	pub title: String,
	#[serde(default)]
	pub description: String,
	#[serde(default = "default_format")]
	pub format: String,
	pub body: String,
	#[serde(default)]
	pub tags: Vec<i64>,
}

/// Which posts a listing may show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
	All,
	Published,
	/// Published posts plus those of authors the user owns
	VisibleTo(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Series {
	pub id: i64,
	pub author: i64,
	pub name: String,
	pub slug: String,
	pub preamble: String,
	pub format: String,
	/// JSON object
	pub config: String,
	pub created: DateTime<Utc>,
}

/// A member of a series: another series or a post
///
/// Written as `series_<id>` or `blogpost_<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeriesItemRef {
	Series(i64),
	Post(i64),
}

impl SeriesItemRef {
	/// Parse a comma separated item list, skipping entries that don't parse
	pub fn parse_list(items: &str) -> Vec<SeriesItemRef> {
		items
			.split(',')
			.map(str::trim)
			.filter_map(|item| item.parse().ok())
			.collect()
	}

	pub(crate) fn column(self) -> (&'static str, i64) {
		match self {
			SeriesItemRef::Series(id) => ("series", id),
			SeriesItemRef::Post(id) => ("post", id),
		}
	}
}

impl FromStr for SeriesItemRef {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (kind, id) = s
			.split_once('_')
			.ok_or_else(|| format!("malformed series item '{s}'"))?;
		let id: i64 = id
			.parse()
			.map_err(|_| format!("malformed series item id '{id}'"))?;
		match kind {
			"series" => Ok(SeriesItemRef::Series(id)),
			"blogpost" => Ok(SeriesItemRef::Post(id)),
			other => Err(format!("unknown series item kind '{other}'")),
		}
	}
}

impl fmt::Display for SeriesItemRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SeriesItemRef::Series(id) => write!(f, "series_{id}"),
			SeriesItemRef::Post(id) => write!(f, "blogpost_{id}"),
		}
	}
}

impl Serialize for SeriesItemRef {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for SeriesItemRef {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// A series item row with the title of what it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SeriesItem {
	pub id: i64,
	pub parent: i64,
	pub series: Option<i64>,
	pub post: Option<i64>,
	pub listorder: i64,
	pub title: Option<String>,
}

impl SeriesItem {
	pub fn item_ref(&self) -> Option<SeriesItemRef> {
		match (self.series, self.post) {
			(Some(id), None) => Some(SeriesItemRef::Series(id)),
			(None, Some(id)) => Some(SeriesItemRef::Post(id)),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSeries {
	pub author: i64,
	pub name: String,
	#[serde(default)]
	pub preamble: String,
	#[serde(default = "default_format")]
	pub format: String,
	#[serde(default)]
	pub config: Option<serde_json::Value>,
	#[serde(default)]
	pub items: Vec<SeriesItemRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesUpdate {
	#[serde(default)]
	pub author: Option<i64>,
	pub name: String,
	#[serde(default)]
	pub preamble: String,
	#[serde(default = "default_format")]
	pub format: String,
	#[serde(default)]
	pub config: Option<serde_json::Value>,
	#[serde(default)]
	pub items: Vec<SeriesItemRef>,
}

/// Series containment tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesNode {
	#[serde(flatten)]
	pub series: Series,
	pub children: Vec<SeriesNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
	pub id: i64,
	pub blogpost: i64,
	pub replyto: Option<i64>,
	pub author: Option<i64>,
	pub approved: bool,
	/// JSON object
	pub metadata: String,
	pub created: DateTime<Utc>,
}

/// A comment with its latest message and surrounding records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentDetail {
	#[serde(flatten)]
	pub comment: Comment,
	pub body: Option<String>,
	pub author_name: Option<String>,
	pub metadata: serde_json::Value,
	pub parent: Option<Box<CommentDetail>>,
	pub post: Option<Post>,
}
