//! Source adapters.
//!
//! The updater only sees [`SourceAdapter`]. Each call returns the candidate
//! articles for one source, all carrying that source's key.

use async_trait::async_trait;

use crate::config::FetchConfig;
use crate::error::{FeederError, Result};
use crate::feed::fetcher::RssFetcher;
use crate::feed::github::GitHubClient;
use crate::feed::types::{Article, FeedSource, SourceKind, GITHUB_PREFIX};

/// Fetches candidate articles for a source.
///
/// Timeouts are the adapter's business; the updater only bounds how many
/// calls run at once.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<Article>>;
}

/// Adapter that routes RSS/Atom sources to [`RssFetcher`] and
/// `github:owner/repo` sources to [`GitHubClient`].
pub struct HttpAdapter {
    rss: RssFetcher,
    github: GitHubClient,
}

impl HttpAdapter {
    pub fn new(config: &FetchConfig, github_token: Option<String>) -> Result<Self> {
        Ok(Self {
            rss: RssFetcher::new(config)?,
            github: GitHubClient::new(config, github_token)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for HttpAdapter {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<Article>> {
        match (source.kind(), source.github_repo()) {
            (SourceKind::GitHub, Some(repo)) => self.github.fetch_releases(repo).await,
            _ if source.url.starts_with(GITHUB_PREFIX) => Err(FeederError::InvalidSource(
                format!("missing GitHub repo in {:?}", source.url),
            )),
            _ => self.rss.fetch(&source.url).await,
        }
    }
}
