//! # Lodestar Blog
//!
//! The blog engine: authors and their owners, categories, tags, versioned
//! posts, ordered series and moderated comments.
//!
//! All operations hang off [`BlogStore`]; each submodule adds one group of
//! them.

pub mod authors;
pub mod categories;
pub mod comments;
pub mod error;
pub mod models;
pub mod posts;
pub mod series;
pub mod slugs;
pub mod store;
pub mod tags;

pub use error::{BlogError, BlogResult};
pub use models::{
	Author, Category, CategoryNode, CategoryUpdate, Comment, CommentDetail, NewPost, NewSeries,
	Post, PostScope, PostUpdate, PostVersion, Series, SeriesItem, SeriesItemRef, SeriesNode,
	SeriesUpdate, Tag, TagSort,
};
pub use store::BlogStore;
