//! GitHub releases as a feed source.
//!
//! A source URL of the form `github:owner/repo` is served from the GitHub
//! REST API. Only the first page of releases is requested; drafts are
//! skipped.

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FeederError, Result};
use crate::feed::fetcher::USER_AGENT;
use crate::feed::types::{Article, GITHUB_PREFIX};

/// Maximum length of a release summary, in characters.
pub const RELEASE_SUMMARY_LENGTH: usize = 200;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// A release as returned by `GET /repos/{owner}/{repo}/releases`.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<ReleaseAuthor>,
}

/// Release author.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAuthor {
    #[serde(default)]
    pub login: String,
}

/// Client for the GitHub releases API.
pub struct GitHubClient {
    client: Client,
    api_url: String,
    per_page: u32,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client. Without a token requests are unauthenticated and
    /// subject to a lower rate limit.
    pub fn new(config: &FetchConfig, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeederError::GitHub(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            per_page: config.github_per_page,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Fetch the published releases of `repo` (`owner/repo`) as articles.
    pub async fn fetch_releases(&self, repo: &str) -> Result<Vec<Article>> {
        let (owner, name) = parse_repo(repo)?;
        let url = format!(
            "{}/repos/{}/{}/releases?per_page={}",
            self.api_url, owner, name, self.per_page
        );

        let mut request = self.client.get(&url).header(ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FeederError::GitHub(format!("fetching releases for {}: {}", repo, e)))?;

        if !response.status().is_success() {
            return Err(FeederError::GitHub(format!(
                "fetching releases for {}: HTTP {}",
                repo,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeederError::GitHub(format!("reading releases for {}: {}", repo, e)))?;

        let articles = parse_releases(repo, &bytes, Utc::now())?;
        debug!("Fetched {} releases for {}", articles.len(), repo);
        Ok(articles)
    }
}

/// Split `owner/repo` into its parts.
pub fn parse_repo(repo: &str) -> Result<(&str, &str)> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
        _ => Err(FeederError::InvalidSource(format!(
            "invalid GitHub repo format {:?}, expected owner/repo",
            repo
        ))),
    }
}

/// Decode a releases response body, dropping drafts.
pub fn parse_releases(repo: &str, body: &[u8], now: DateTime<Utc>) -> Result<Vec<Article>> {
    let releases: Vec<Release> = serde_json::from_slice(body)
        .map_err(|e| FeederError::GitHub(format!("decoding releases for {}: {}", repo, e)))?;

    Ok(releases
        .into_iter()
        .filter(|r| !r.draft)
        .map(|r| map_release(repo, r, now))
        .collect())
}

/// Convert a release to an article keyed by `github:{repo}`.
pub fn map_release(repo: &str, release: Release, now: DateTime<Utc>) -> Article {
    let title = release_title(repo, &release);
    let body = release.body.unwrap_or_default();
    let author = release.author.map(|a| a.login).unwrap_or_default();
    let published_at = release
        .published_at
        .or(release.created_at)
        .unwrap_or(now);

    Article::new(
        format!("{}{}", GITHUB_PREFIX, repo),
        format!("{}{}:{}", GITHUB_PREFIX, repo, release.id),
        title,
        published_at,
    )
    .with_url(release.html_url)
    .with_author(author)
    .with_summary(truncate(&body, RELEASE_SUMMARY_LENGTH))
    .with_content(body)
    .with_fetched_at(now)
}

/// Release name, else `"{repo} {tag}"`, else `"{repo} release"`.
fn release_title(repo: &str, release: &Release) -> String {
    match release.name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ if !release.tag_name.is_empty() => format!("{} {}", repo, release.tag_name),
        _ => format!("{} release", repo),
    }
}

/// Shorten `s` to at most `max_len` characters, ending in "..." when cut.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_len.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
