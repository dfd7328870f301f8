//! Article cache.
//!
//! Articles are partitioned by source key. Within a partition the order is
//! significant: a refresh prepends fresh articles ahead of the existing ones,
//! so lists read newest-first without the store ever sorting them.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::feed::types::Article;
use crate::store::json::{null_as_default, read_json, write_json};
use crate::Result;

/// Current on-disk cache format version.
pub const CACHE_VERSION: u32 = 1;

fn default_version() -> u32 {
    CACHE_VERSION
}

/// Cached articles grouped by source key, with per-source fetch times.
///
/// The cache is disposable: deleting the file only means the next refresh
/// starts from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleStore {
    /// Format version.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    articles: BTreeMap<String, Vec<Article>>,
    #[serde(default, deserialize_with = "null_as_default")]
    last_fetched: BTreeMap<String, DateTime<Utc>>,
}

impl Default for ArticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            version: CACHE_VERSION,
            articles: BTreeMap::new(),
            last_fetched: BTreeMap::new(),
        }
    }

    /// Load the store from `path`. A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match read_json::<Self>(path, "cache")? {
            Some(mut store) => {
                let rekeyed = store.rekey_partitions();
                if rekeyed > 0 {
                    warn!(
                        "Cache {}: {} article(s) carried a foreign feed_url, re-keyed to their partition",
                        path.display(),
                        rekeyed
                    );
                }
                debug!(
                    "Loaded cache {} ({} articles)",
                    path.display(),
                    store.article_count()
                );
                Ok(store)
            }
            None => {
                debug!("No cache at {}, starting empty", path.display());
                Ok(Self::new())
            }
        }
    }

    /// Write the store to `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_json(path, self)?;
        debug!(
            "Saved cache {} ({} articles)",
            path.display(),
            self.article_count()
        );
        Ok(())
    }

    /// Articles cached for a source, newest first. Empty when unknown.
    pub fn articles_for(&self, key: &str) -> &[Article] {
        self.articles.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every cached article across all sources.
    pub fn all_articles(&self) -> impl Iterator<Item = &Article> {
        self.articles.values().flatten()
    }

    /// Replace the articles cached for a source.
    ///
    /// Every article ends up carrying `key` as its source key.
    pub fn set_articles(&mut self, key: &str, mut articles: Vec<Article>) {
        rekey(key, &mut articles);
        self.articles.insert(key.to_string(), articles);
    }

    /// Put `fresh` ahead of the articles already cached for a source.
    pub fn merge_fresh(&mut self, key: &str, mut fresh: Vec<Article>) {
        rekey(key, &mut fresh);
        let existing = self.articles.remove(key).unwrap_or_default();
        let mut merged = fresh;
        merged.extend(existing);
        self.articles.insert(key.to_string(), merged);
    }

    /// Record when a source was last fetched successfully.
    pub fn record_fetch(&mut self, key: &str, at: DateTime<Utc>) {
        self.last_fetched.insert(key.to_string(), at);
    }

    /// When a source was last fetched successfully.
    pub fn last_fetched(&self, key: &str) -> Option<DateTime<Utc>> {
        self.last_fetched.get(key).copied()
    }

    /// Total number of cached articles.
    pub fn article_count(&self) -> usize {
        self.articles.values().map(Vec::len).sum()
    }

    /// Number of sources with a cache partition.
    pub fn source_count(&self) -> usize {
        self.articles.len()
    }

    fn rekey_partitions(&mut self) -> usize {
        self.articles
            .iter_mut()
            .map(|(key, articles)| rekey(key, articles))
            .sum()
    }
}

/// Set `key` on every article that lacks it. Returns how many changed.
fn rekey(key: &str, articles: &mut [Article]) -> usize {
    let mut changed = 0;
    for article in articles.iter_mut().filter(|a| a.source_key != key) {
        article.source_key = key.to_string();
        changed += 1;
    }
    changed
}
