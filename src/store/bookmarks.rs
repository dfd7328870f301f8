//! Bookmark file.
//!
//! Bookmarks are appended to a markdown file and never rewritten, so the
//! file can be edited by hand or synced with git. They are independent of
//! the article cache: expiring an article does not touch its bookmark.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::feed::types::Article;
use crate::{FeederError, Result};

/// A saved article with optional notes.
#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    /// Display name of the source.
    pub feed_name: String,
    pub title: String,
    pub url: String,
    /// Publish time of the article.
    pub date: DateTime<Utc>,
    pub notes: String,
    pub saved_at: DateTime<Utc>,
}

impl Bookmark {
    /// Bookmark `article`, saved now.
    pub fn from_article(feed_name: impl Into<String>, article: &Article) -> Self {
        Self {
            feed_name: feed_name.into(),
            title: article.title().to_string(),
            url: article.url.clone(),
            date: article.published_at,
            notes: String::new(),
            saved_at: Utc::now(),
        }
    }

    /// Attach notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Render as a markdown section.
    pub fn to_markdown(&self) -> String {
        let mut entry = format!("## {}\n\n", self.title);
        entry.push_str(&format!("- Source: {}\n", self.feed_name));
        if !self.url.is_empty() {
            entry.push_str(&format!("- URL: <{}>\n", self.url));
        }
        entry.push_str(&format!("- Published: {}\n", self.date.format("%Y-%m-%d")));
        entry.push_str(&format!(
            "- Saved: {}\n",
            self.saved_at.format("%Y-%m-%d %H:%M UTC")
        ));
        if !self.notes.is_empty() {
            entry.push_str(&format!("\n{}\n", self.notes.trim_end()));
        }
        entry.push('\n');
        entry
    }
}

/// Append `bookmark` to the file at `path`, creating it and its directory
/// if needed. Existing content is never truncated.
pub fn append_bookmark(path: impl AsRef<Path>, bookmark: &Bookmark) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| {
            FeederError::Storage(format!("creating directory {}: {}", dir.display(), e))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            FeederError::Storage(format!("opening bookmark file {}: {}", path.display(), e))
        })?;
    file.write_all(bookmark.to_markdown().as_bytes())
        .map_err(|e| {
            FeederError::Storage(format!("writing bookmark file {}: {}", path.display(), e))
        })?;

    debug!("Bookmarked {:?} in {}", bookmark.title, path.display());
    Ok(())
}
