//! Flat-file storage for feeder.
//!
//! This module persists the article cache and the read state as JSON, and
//! appends bookmarks to a markdown file.
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written file behind.

pub mod bookmarks;
pub mod cache;
mod json;
pub mod state;

pub use bookmarks::{append_bookmark, Bookmark};
pub use cache::{ArticleStore, CACHE_VERSION};
pub use state::{ReadState, STATE_VERSION};
