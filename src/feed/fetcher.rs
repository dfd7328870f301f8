//! RSS/Atom feed fetcher.
//!
//! Fetches a feed over HTTP with timeouts and a size limit, then maps each
//! entry to an [`Article`] candidate keyed by the feed URL.

use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FeederError, Result};
use crate::feed::types::Article;

/// User agent string for feed fetching.
pub const USER_AGENT: &str = concat!("feeder/", env!("CARGO_PKG_VERSION"));

/// RSS/Atom fetcher sharing one HTTP client across requests.
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
}

impl RssFetcher {
    /// Create a fetcher using the timeouts and limits from `config`.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeederError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Fetch and parse the feed at `url`.
    ///
    /// The returned articles are keyed by `url`.
    pub async fn fetch(&self, url: &str) -> Result<Vec<Article>> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeederError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeederError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FeederError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeederError::Fetch(format!("failed to read response: {}", e)))?;

        // Content-Length may be absent or wrong.
        if bytes.len() as u64 > self.max_feed_size {
            return Err(FeederError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        let articles = parse_feed(url, &bytes, Utc::now())?;
        debug!("Parsed {} entries from {}", articles.len(), url);
        Ok(articles)
    }
}

/// Check that a feed URL is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| FeederError::InvalidSource(format!("invalid URL {:?}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeederError::InvalidSource(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(FeederError::InvalidSource(format!(
            "URL has no host: {}",
            url
        )));
    }

    Ok(())
}

/// Parse feed bytes into article candidates for `source_key`.
///
/// Entries missing a publish date fall back to the update date, then to
/// `fetched_at`. Entries without an id get a stable GUID from
/// [`entry_guid`].
pub fn parse_feed(source_key: &str, bytes: &[u8], fetched_at: DateTime<Utc>) -> Result<Vec<Article>> {
    // feed-rs would otherwise invent ids (hashed or random) for id-less entries.
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)
        .map_err(|e| FeederError::Fetch(format!("failed to parse feed: {}", e)))?;

    let articles = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let guid = entry_guid(source_key, &entry.id, &link, &title);
            let summary = entry
                .summary
                .map(|t| strip_html(&t.content))
                .unwrap_or_default();
            let content = entry.content.and_then(|c| c.body).unwrap_or_default();
            let author = entry
                .authors
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_default();
            let published_at = entry.published.or(entry.updated).unwrap_or(fetched_at);

            Article::new(source_key, guid, title, published_at)
                .with_url(link)
                .with_author(author)
                .with_summary(summary)
                .with_content(content)
                .with_fetched_at(fetched_at)
        })
        .collect();

    Ok(articles)
}

/// Stable identifier for an entry: its id, else its link, else a hash of
/// the source key and title.
fn entry_guid(source_key: &str, id: &str, link: &str, title: &str) -> String {
    if !id.is_empty() {
        return id.to_string();
    }
    if !link.is_empty() {
        return link.to_string();
    }

    let digest = Sha256::digest(format!("{}|{}", source_key, title).as_bytes());
    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!("sha256:{}", hex)
}

/// Strip HTML tags from text and decode common entities.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '&' if !in_tag => {
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                match entity.as_str() {
                    "amp" => result.push('&'),
                    "lt" => result.push('<'),
                    "gt" => result.push('>'),
                    "quot" => result.push('"'),
                    "apos" => result.push('\''),
                    "nbsp" => result.push(' '),
                    _ if entity.starts_with('#') => {
                        if let Some(c) = parse_numeric_entity(&entity).and_then(char::from_u32) {
                            result.push(c);
                        }
                    }
                    _ => {
                        // Unknown entity, keep as-is
                        result.push('&');
                        result.push_str(&entity);
                        result.push(';');
                    }
                }
            }
            // A bare '&' followed by whitespace is plain text.
            c if in_entity && c.is_whitespace() => {
                in_entity = false;
                result.push('&');
                result.push_str(&entity);
                result.push(c);
            }
            _ if in_entity => entity.push(ch),
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    if in_entity {
        result.push('&');
        result.push_str(&entity);
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#')?.parse().ok()
    }
}
