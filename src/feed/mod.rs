//! Feed ingestion for feeder.
//!
//! This module provides:
//! - Source adapters for RSS/Atom feeds and GitHub releases
//! - Title normalization and duplicate detection
//! - The concurrent refresh cycle and the retention sweep

pub mod adapter;
pub mod dedup;
pub mod expiry;
pub mod fetcher;
pub mod github;
pub mod normalize;
pub mod retention;
pub mod types;
pub mod updater;

pub use adapter::{HttpAdapter, SourceAdapter};
pub use dedup::{
    is_duplicate, is_duplicate_at, jaro_winkler, DEDUP_THRESHOLD, DEDUP_WINDOW_FLOOR_DAYS,
};
pub use expiry::{expire_old, expire_old_at};
pub use fetcher::{parse_feed, RssFetcher};
pub use github::{parse_repo, GitHubClient};
pub use normalize::normalize_title;
pub use retention::{
    resolve_retention, retention_resolver, RetentionResolver, DEFAULT_RETENTION_DAYS,
};
pub use types::{Article, FeedSource, FetchResult, SourceKind};
pub use updater::{FeedUpdater, MAX_CONCURRENT_FETCHES};
