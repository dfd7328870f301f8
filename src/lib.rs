//! feeder - RSS/Atom and GitHub release reader core
//!
//! Fetches configured sources concurrently, drops articles already seen
//! (by GUID, URL or a fuzzy title match) and keeps the rest in a JSON cache
//! with per-source retention.

pub mod config;
pub mod datetime;
pub mod error;
pub mod feed;
pub mod logging;
pub mod store;

pub use config::Config;
pub use error::{FeederError, Result};
pub use feed::{
    expire_old, is_duplicate, normalize_title, Article, FeedSource, FeedUpdater, FetchResult,
    HttpAdapter, RetentionResolver, SourceAdapter,
};
pub use store::{append_bookmark, ArticleStore, Bookmark, ReadState};
