//! Read state.
//!
//! Tracks which article GUIDs have been read. The file is small and diffable
//! so it can be synced between machines. It is independent of the article
//! cache: expiring an article never touches its read flag.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::feed::types::Article;
use crate::store::json::{null_as_default, read_json, write_json};
use crate::Result;

/// Current on-disk state format version.
pub const STATE_VERSION: u32 = 1;

fn default_version() -> u32 {
    STATE_VERSION
}

/// Set of read article GUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadState {
    /// Format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// GUIDs marked as read, in the order they were marked.
    #[serde(default, deserialize_with = "null_as_default")]
    pub read: Vec<String>,
    /// Last sync time, as written by the sync tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
}

impl Default for ReadState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            read: Vec::new(),
            last_synced: None,
        }
    }
}

impl ReadState {
    /// Load the state from `path`. A missing file yields an empty state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(read_json(path.as_ref(), "state")?.unwrap_or_default())
    }

    /// Write the state to `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json(path.as_ref(), self)
    }

    /// Check whether a GUID has been marked as read.
    pub fn is_read(&self, guid: &str) -> bool {
        self.read.iter().any(|g| g == guid)
    }

    /// Mark a GUID as read. Marking twice is a no-op.
    pub fn mark_read(&mut self, guid: impl Into<String>) {
        let guid = guid.into();
        if !self.is_read(&guid) {
            self.read.push(guid);
        }
    }

    /// Remove a GUID from the read list.
    pub fn mark_unread(&mut self, guid: &str) {
        self.read.retain(|g| g != guid);
    }

    /// Number of `articles` not marked as read.
    pub fn unread_count<'a>(&self, articles: impl IntoIterator<Item = &'a Article>) -> usize {
        articles
            .into_iter()
            .filter(|a| !self.is_read(&a.guid))
            .count()
    }
}
