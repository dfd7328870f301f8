//! Refresh cycle.
//!
//! One task per source, at most `max_concurrent` adapter calls in flight.
//! Each task gets a snapshot of its source's cached articles, classifies the
//! candidates against it and hands back the fresh ones. The store is only
//! touched after every task has finished, in source order, so a failed or
//! cancelled source leaves its cached articles exactly as they were.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::FeederError;
use crate::feed::adapter::SourceAdapter;
use crate::feed::dedup::is_duplicate_at;
use crate::feed::expiry;
use crate::feed::retention::{retention_for, RetentionResolver};
use crate::feed::types::{Article, FeedSource, FetchResult};
use crate::store::ArticleStore;

/// Default cap on concurrent adapter calls.
pub const MAX_CONCURRENT_FETCHES: usize = 5;

/// Runs refresh cycles and expiry sweeps over a set of sources.
pub struct FeedUpdater {
    adapter: Arc<dyn SourceAdapter>,
    retention: Option<RetentionResolver>,
    max_concurrent: usize,
}

impl FeedUpdater {
    /// Create an updater with the default concurrency and no retention
    /// resolver.
    pub fn new(adapter: Arc<dyn SourceAdapter>) -> Self {
        Self {
            adapter,
            retention: None,
            max_concurrent: MAX_CONCURRENT_FETCHES,
        }
    }

    /// Use `resolver` to find each source's retention.
    pub fn with_retention(mut self, resolver: RetentionResolver) -> Self {
        self.retention = Some(resolver);
        self
    }

    /// Set the concurrency cap. Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Current concurrency cap.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Fetch every source and merge the fresh articles into `store`.
    ///
    /// The returned results line up with `sources` by index.
    pub async fn refresh_all(
        &self,
        sources: &[FeedSource],
        store: &mut ArticleStore,
    ) -> Vec<FetchResult> {
        self.refresh_all_with_cancel(sources, store, &CancellationToken::new())
            .await
    }

    /// Like [`refresh_all`](Self::refresh_all), stopping early on `cancel`.
    ///
    /// Once cancelled, sources still waiting for a slot fail with
    /// [`FeederError::Cancelled`]. Calls already in flight run to completion
    /// and their results are merged as usual.
    pub async fn refresh_all_with_cancel(
        &self,
        sources: &[FeedSource],
        store: &mut ArticleStore,
        cancel: &CancellationToken,
    ) -> Vec<FetchResult> {
        info!(
            "Refreshing {} source(s), up to {} at a time",
            sources.len(),
            self.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(sources.len());

        for source in sources {
            let task = FetchTask {
                adapter: Arc::clone(&self.adapter),
                semaphore: Arc::clone(&semaphore),
                cancel: cancel.clone(),
                existing: store.articles_for(source.key()).to_vec(),
                retention_days: retention_for(self.retention.as_ref(), source),
                source: source.clone(),
            };
            handles.push(tokio::spawn(task.run()));
        }

        let mut results = Vec::with_capacity(sources.len());
        for (source, handle) in sources.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Fetch task for {} failed: {}", source.name, e);
                    FetchResult::failed(source.clone(), FeederError::Task(e.to_string()))
                }
            };
            results.push(result);
        }

        let fetched_at = Utc::now();
        for result in &results {
            if result.is_ok() {
                let key = result.source.key();
                store.merge_fresh(key, result.fresh.clone());
                store.record_fetch(key, fetched_at);
            }
        }

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        let fresh: usize = results.iter().map(|r| r.fresh.len()).sum();
        if cancel.is_cancelled() {
            warn!("Refresh cancelled: {} new, {} source(s) not fetched", fresh, failed);
        } else {
            info!("Refresh complete: {} new, {} failed", fresh, failed);
        }

        results
    }

    /// Drop cached articles older than each source's retention.
    ///
    /// Returns the number of articles removed.
    pub fn expire_old(&self, sources: &[FeedSource], store: &mut ArticleStore) -> usize {
        expiry::expire_old(sources, store, self.retention.as_ref())
    }
}

/// Work for a single source.
struct FetchTask {
    adapter: Arc<dyn SourceAdapter>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    existing: Vec<Article>,
    retention_days: u32,
    source: FeedSource,
}

impl FetchTask {
    async fn run(self) -> FetchResult {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Skipping {}: refresh cancelled", self.source.name);
                return FetchResult::failed(self.source, FeederError::Cancelled);
            }
            permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return FetchResult::failed(self.source, FeederError::Cancelled),
            },
        };

        let candidates = match self.adapter.fetch(&self.source).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Failed to fetch {}: {}", self.source.name, e);
                return FetchResult::failed(self.source, e);
            }
        };

        let fetched = candidates.len();
        let fresh = classify(
            &self.source,
            candidates,
            &self.existing,
            self.retention_days,
        );

        info!(
            "{}: {} fetched, {} new, {} duplicate(s)",
            self.source.name,
            fetched,
            fresh.len(),
            fetched - fresh.len()
        );

        FetchResult::ok(self.source, fetched, fresh)
    }
}

/// Keep the candidates that do not duplicate `existing`, in adapter order.
///
/// Candidates are only compared against `existing`, never against each
/// other. Candidates carrying another source's key are re-keyed first.
fn classify(
    source: &FeedSource,
    candidates: Vec<Article>,
    existing: &[Article],
    retention_days: u32,
) -> Vec<Article> {
    let key = source.key();
    let now = Utc::now();
    let mut mislabeled = 0usize;

    let fresh = candidates
        .into_iter()
        .map(|mut article| {
            if article.source_key != key {
                mislabeled += 1;
                article.source_key = key.to_string();
            }
            article
        })
        .filter(|article| !is_duplicate_at(article, existing, retention_days, now))
        .collect();

    if mislabeled > 0 {
        warn!(
            "{}: adapter returned {} article(s) with a foreign source key",
            source.name, mislabeled
        );
    }

    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::feed::retention::retention_resolver;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;

    const FEED: &str = "https://example.com/feed.xml";

    /// Adapter returning canned responses per source URL.
    #[derive(Default)]
    struct CannedAdapter {
        responses: HashMap<String, Vec<Article>>,
        failing: Vec<String>,
    }

    impl CannedAdapter {
        fn respond(mut self, url: &str, articles: Vec<Article>) -> Self {
            self.responses.insert(url.to_string(), articles);
            self
        }

        fn fail(mut self, url: &str) -> Self {
            self.failing.push(url.to_string());
            self
        }
    }

    #[async_trait]
    impl SourceAdapter for CannedAdapter {
        async fn fetch(&self, source: &FeedSource) -> Result<Vec<Article>> {
            if self.failing.contains(&source.url) {
                return Err(FeederError::Fetch("connection refused".to_string()));
            }
            Ok(self.responses.get(&source.url).cloned().unwrap_or_default())
        }
    }

    fn article(key: &str, guid: &str, title: &str, age_days: i64) -> Article {
        Article::new(key, guid, title, Utc::now() - Duration::days(age_days))
    }

    fn guids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.guid.as_str()).collect()
    }

    #[test]
    fn test_with_concurrency_clamps_to_one() {
        let updater = FeedUpdater::new(Arc::new(CannedAdapter::default())).with_concurrency(0);
        assert_eq!(updater.max_concurrent(), 1);
    }

    #[test]
    fn test_default_concurrency() {
        let updater = FeedUpdater::new(Arc::new(CannedAdapter::default()));
        assert_eq!(updater.max_concurrent(), MAX_CONCURRENT_FETCHES);
    }

    #[test]
    fn test_classify_rekeys_foreign_articles() {
        let source = FeedSource::new("Example", FEED);
        let candidates = vec![article("https://elsewhere.example/feed", "g1", "Hello", 0)];
        let fresh = classify(&source, candidates, &[], 7);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].source_key, FEED);
    }

    #[test]
    fn test_classify_keeps_same_cycle_near_duplicates() {
        let source = FeedSource::new("Example", FEED);
        let candidates = vec![
            article(FEED, "a", "Release notes v1", 0),
            article(FEED, "b", "Release notes v2", 0),
        ];
        let fresh = classify(&source, candidates, &[], 7);
        assert_eq!(guids(&fresh), ["a", "b"]);
    }

    #[tokio::test]
    async fn test_refresh_merges_fresh_ahead_of_existing() {
        let source = FeedSource::new("Example", FEED);
        let mut store = ArticleStore::new();
        store.set_articles(
            FEED,
            vec![
                article(FEED, "e0", "Kernel scheduling deep dive", 1),
                article(FEED, "e1", "Why we moved to postgres", 2),
            ],
        );

        let adapter = CannedAdapter::default().respond(
            FEED,
            vec![
                article(FEED, "f0", "Announcing the new query planner", 0),
                article(FEED, "e0", "Kernel scheduling deep dive", 1),
                article(FEED, "f1", "Community survey results", 0),
            ],
        );
        let updater = FeedUpdater::new(Arc::new(adapter));

        let results = updater.refresh_all(&[source], &mut store).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
        assert_eq!(results[0].fetched, 3);
        assert_eq!(results[0].duplicates(), 1);
        assert_eq!(guids(store.articles_for(FEED)), ["f0", "f1", "e0", "e1"]);
        assert!(store.last_fetched(FEED).is_some());
    }

    #[tokio::test]
    async fn test_refresh_failure_leaves_store_untouched() {
        let source = FeedSource::new("Example", FEED);
        let mut store = ArticleStore::new();
        store.set_articles(FEED, vec![article(FEED, "e0", "Existing", 1)]);

        let updater = FeedUpdater::new(Arc::new(CannedAdapter::default().fail(FEED)));
        let results = updater.refresh_all(&[source], &mut store).await;

        assert!(matches!(results[0].error, Some(FeederError::Fetch(_))));
        assert_eq!(guids(store.articles_for(FEED)), ["e0"]);
        assert!(store.last_fetched(FEED).is_none());
    }

    #[tokio::test]
    async fn test_refresh_with_no_sources() {
        let mut store = ArticleStore::new();
        let updater = FeedUpdater::new(Arc::new(CannedAdapter::default()));
        let results = updater.refresh_all(&[], &mut store).await;
        assert!(results.is_empty());
        assert_eq!(store.article_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_cancelled_before_start() {
        let sources = vec![
            FeedSource::new("A", "https://a.example/feed"),
            FeedSource::new("B", "https://b.example/feed"),
        ];
        let mut store = ArticleStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let updater = FeedUpdater::new(Arc::new(CannedAdapter::default()));
        let results = updater
            .refresh_all_with_cancel(&sources, &mut store, &cancel)
            .await;

        assert_eq!(results.len(), 2);
        for (result, source) in results.iter().zip(&sources) {
            assert_eq!(&result.source, source);
            assert!(matches!(result.error, Some(FeederError::Cancelled)));
        }
        assert!(store.last_fetched("https://a.example/feed").is_none());
    }

    #[tokio::test]
    async fn test_refresh_uses_resolved_retention() {
        // Existing article is 20 days old: outside the 14-day floor, inside
        // a 30-day retention window.
        let source = FeedSource::new("Example", FEED).with_retention_days(30);
        let mut store = ArticleStore::new();
        store.set_articles(FEED, vec![article(FEED, "e0", "Go 1.24 Released", 20)]);

        let candidate = || vec![article(FEED, "", "Go 1.24.0 Released", 0)];

        let updater = FeedUpdater::new(Arc::new(CannedAdapter::default().respond(FEED, candidate())));
        let mut without = store.clone();
        let results = updater.refresh_all(&[source.clone()], &mut without).await;
        assert_eq!(results[0].fresh.len(), 1);

        let updater = FeedUpdater::new(Arc::new(CannedAdapter::default().respond(FEED, candidate())))
            .with_retention(retention_resolver(7));
        let results = updater.refresh_all(&[source], &mut store).await;
        assert!(results[0].fresh.is_empty());
    }
}
