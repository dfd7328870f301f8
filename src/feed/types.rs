//! Feed types for feeder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FeederError;
use crate::feed::normalize::normalize_title;

/// URL prefix marking a source as a GitHub release tracker.
pub const GITHUB_PREFIX: &str = "github:";

/// Maximum length for a stored summary, in characters.
pub const MAX_SUMMARY_LENGTH: usize = 1000;

/// Kind of a configured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// RSS or Atom feed fetched over HTTP.
    Rss,
    /// GitHub repository releases.
    GitHub,
}

/// A configured feed source.
///
/// The `url` doubles as the partition key in the article store. GitHub
/// sources use the synthetic `github:owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Display name.
    pub name: String,
    /// Feed URL or `github:owner/repo`.
    pub url: String,
    /// Optional grouping tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Per-source retention override in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
}

impl FeedSource {
    /// Create a new source.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            tag: None,
            retention_days: None,
        }
    }

    /// Set the tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the retention override.
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    /// Store partition key for this source.
    pub fn key(&self) -> &str {
        &self.url
    }

    /// Kind of this source, derived from its URL.
    pub fn kind(&self) -> SourceKind {
        match self.url.strip_prefix(GITHUB_PREFIX) {
            Some(rest) if !rest.is_empty() => SourceKind::GitHub,
            _ => SourceKind::Rss,
        }
    }

    /// Check whether this source tracks GitHub releases.
    pub fn is_github(&self) -> bool {
        self.kind() == SourceKind::GitHub
    }

    /// The `owner/repo` part of a GitHub source, if this is one.
    pub fn github_repo(&self) -> Option<&str> {
        match self.kind() {
            SourceKind::GitHub => self.url.strip_prefix(GITHUB_PREFIX),
            SourceKind::Rss => None,
        }
    }
}

/// A single entry from a source (RSS item, Atom entry or GitHub release).
///
/// Candidates coming out of an adapter and items held in the store share
/// this shape. The normalized title is always derived from the title; it
/// is recomputed on construction, on [`Article::set_title`] and when an
/// article is loaded from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ArticleRecord")]
pub struct Article {
    /// Stable identifier, may be empty.
    pub guid: String,
    /// Key of the source this article came from.
    #[serde(rename = "feed_url")]
    pub source_key: String,
    title: String,
    /// Canonical link, may be empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Author name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    /// Short plain-text summary.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    /// Full content as delivered by the source.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Best-effort publish time.
    pub published_at: DateTime<Utc>,
    /// When the article was fetched.
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    normalized_title: String,
}

impl Article {
    /// Create a new article. `fetched_at` defaults to `published_at`.
    pub fn new(
        source_key: impl Into<String>,
        guid: impl Into<String>,
        title: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        let normalized_title = normalize_title(&title);
        Self {
            guid: guid.into(),
            source_key: source_key.into(),
            title,
            url: String::new(),
            author: String::new(),
            summary: String::new(),
            content: String::new(),
            published_at,
            fetched_at: published_at,
            normalized_title,
        }
    }

    /// Set the link.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the summary, truncated to [`MAX_SUMMARY_LENGTH`] characters.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        self.summary = if summary.chars().count() > MAX_SUMMARY_LENGTH {
            summary.chars().take(MAX_SUMMARY_LENGTH).collect()
        } else {
            summary
        };
        self
    }

    /// Set the content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the fetch time.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Raw display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Comparable form of the title.
    pub fn normalized_title(&self) -> &str {
        &self.normalized_title
    }

    /// Replace the title, re-deriving the normalized form.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.normalized_title = normalize_title(&self.title);
    }
}

/// On-disk shape of an article. The stored normalized title is ignored
/// and re-derived so older caches pick up normalizer changes.
#[derive(Deserialize)]
struct ArticleRecord {
    #[serde(default)]
    guid: String,
    #[serde(rename = "feed_url", default)]
    source_key: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    content: String,
    published_at: DateTime<Utc>,
    fetched_at: DateTime<Utc>,
}

impl From<ArticleRecord> for Article {
    fn from(record: ArticleRecord) -> Self {
        Article::new(
            record.source_key,
            record.guid,
            record.title,
            record.published_at,
        )
        .with_url(record.url)
        .with_author(record.author)
        .with_summary(record.summary)
        .with_content(record.content)
        .with_fetched_at(record.fetched_at)
    }
}

/// Outcome of fetching one source during a refresh cycle.
#[derive(Debug)]
pub struct FetchResult {
    /// The source this result belongs to.
    pub source: FeedSource,
    /// Number of candidates the adapter returned.
    pub fetched: usize,
    /// Candidates accepted as new, in adapter order.
    pub fresh: Vec<Article>,
    /// Set when the source could not be fetched.
    pub error: Option<FeederError>,
}

impl FetchResult {
    /// Successful result.
    pub fn ok(source: FeedSource, fetched: usize, fresh: Vec<Article>) -> Self {
        Self {
            source,
            fetched,
            fresh,
            error: None,
        }
    }

    /// Failed result.
    pub fn failed(source: FeedSource, error: FeederError) -> Self {
        Self {
            source,
            fetched: 0,
            fresh: Vec::new(),
            error: Some(error),
        }
    }

    /// Check whether the fetch succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Number of candidates rejected as duplicates.
    pub fn duplicates(&self) -> usize {
        self.fetched.saturating_sub(self.fresh.len())
    }
}
