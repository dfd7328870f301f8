//! Duplicate detection for incoming articles.
//!
//! An incoming article is checked against the articles already cached for
//! its source in three tiers, cheapest first:
//!
//! 1. identical non-empty GUID
//! 2. identical non-empty URL
//! 3. Jaro-Winkler similarity of normalized titles, limited to cached
//!    articles published inside the fuzzy window

use chrono::{DateTime, Utc};

use crate::feed::retention::retention_cutoff;
use crate::feed::types::Article;

/// Minimum title similarity for two articles to count as duplicates.
pub const DEDUP_THRESHOLD: f64 = 0.85;

/// Lower bound of the fuzzy-title lookback window, in days.
pub const DEDUP_WINDOW_FLOOR_DAYS: u32 = 14;

/// Jaro score above which the common-prefix bonus is applied.
pub const JARO_WINKLER_BOOST_THRESHOLD: f64 = 0.7;

/// Maximum common-prefix length rewarded by the Winkler bonus.
pub const JARO_WINKLER_PREFIX_SIZE: usize = 4;

/// Winkler prefix scaling factor.
const PREFIX_SCALE: f64 = 0.1;

/// Check whether `candidate` duplicates any of `existing`, as of now.
pub fn is_duplicate(candidate: &Article, existing: &[Article], retention_days: u32) -> bool {
    is_duplicate_at(candidate, existing, retention_days, Utc::now())
}

/// Check whether `candidate` duplicates any of `existing`, as of `now`.
///
/// Never fails: empty identifiers and empty titles simply skip their tier.
pub fn is_duplicate_at(
    candidate: &Article,
    existing: &[Article],
    retention_days: u32,
    now: DateTime<Utc>,
) -> bool {
    if existing.is_empty() {
        return false;
    }

    if !candidate.guid.is_empty() && existing.iter().any(|e| e.guid == candidate.guid) {
        return true;
    }

    if !candidate.url.is_empty() && existing.iter().any(|e| e.url == candidate.url) {
        return true;
    }

    let title = candidate.normalized_title();
    if title.is_empty() {
        return false;
    }

    let cutoff = retention_cutoff(now, fuzzy_window_days(retention_days));

    existing
        .iter()
        .filter(|e| e.published_at >= cutoff)
        .filter(|e| !e.normalized_title().is_empty())
        .any(|e| {
            meets_threshold(jaro_winkler(
                title,
                e.normalized_title(),
                JARO_WINKLER_BOOST_THRESHOLD,
                JARO_WINKLER_PREFIX_SIZE,
            ))
        })
}

/// Lookback window for the fuzzy-title tier.
pub fn fuzzy_window_days(retention_days: u32) -> u32 {
    retention_days.max(DEDUP_WINDOW_FLOOR_DAYS)
}

/// Check whether a similarity score is high enough to be a duplicate.
pub fn meets_threshold(score: f64) -> bool {
    score >= DEDUP_THRESHOLD
}

/// Jaro-Winkler similarity with a configurable boost threshold.
///
/// The common-prefix bonus (up to `prefix_size` characters) is only added
/// when the plain Jaro score exceeds `boost_threshold`, so agreement early
/// in the strings weighs more than agreement late in them.
pub fn jaro_winkler(a: &str, b: &str, boost_threshold: f64, prefix_size: usize) -> f64 {
    let jaro = strsim::jaro(a, b);
    if jaro <= boost_threshold {
        return jaro;
    }

    let prefix = a
        .chars()
        .zip(b.chars())
        .take(prefix_size)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + PREFIX_SCALE * prefix as f64 * (1.0 - jaro)
}
