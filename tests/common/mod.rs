//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use feeder::{Article, FeedSource, FeederError, Result, SourceAdapter};

/// Build an article published `age_days` ago.
pub fn article(key: &str, guid: &str, title: &str, age_days: i64) -> Article {
    Article::new(key, guid, title, Utc::now() - chrono::Duration::days(age_days))
}

/// GUIDs of `articles`, in order.
pub fn guids(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.guid.as_str()).collect()
}

/// `count` sources named `feed-N` with distinct URLs.
pub fn sources(count: usize) -> Vec<FeedSource> {
    (0..count)
        .map(|i| FeedSource::new(format!("feed-{i}"), format!("https://feed{i}.example.com/rss")))
        .collect()
}

/// Adapter with a fixed response per source URL.
///
/// Unknown URLs return an empty list.
#[derive(Default)]
pub struct ScriptedAdapter {
    responses: HashMap<String, Vec<Article>>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, articles: Vec<Article>) -> Self {
        self.responses.insert(url.to_string(), articles);
        self
    }

    pub fn fail(mut self, url: &str, message: &str) -> Self {
        self.failures.insert(url.to_string(), message.to_string());
        self
    }

    /// URLs fetched so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<Article>> {
        self.calls.lock().unwrap().push(source.url.clone());
        if let Some(message) = self.failures.get(&source.url) {
            return Err(FeederError::Fetch(message.clone()));
        }
        Ok(self.responses.get(&source.url).cloned().unwrap_or_default())
    }
}

/// Adapter that records the peak number of concurrent calls.
pub struct CountingAdapter {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingAdapter {
    pub fn new(delay: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for CountingAdapter {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<Article>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![article(&source.url, &format!("{}#1", source.url), &source.name, 0)])
    }
}

/// Adapter that cancels the refresh from inside its first call, then
/// completes that call normally.
pub struct CancellingAdapter {
    cancel: CancellationToken,
}

impl CancellingAdapter {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

#[async_trait]
impl SourceAdapter for CancellingAdapter {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<Article>> {
        self.cancel.cancel();
        Ok(vec![article(&source.url, "only", "The only article", 0)])
    }
}
