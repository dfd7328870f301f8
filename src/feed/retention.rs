//! Retention resolution.
//!
//! Retention is resolved per source: the source's own override if it has
//! one, otherwise the global default. The resolver is passed explicitly to
//! the updater and the expiry sweep rather than read from global state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::feed::types::FeedSource;

/// Retention used when no resolver is supplied.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Function from a source to its effective retention in days.
pub type RetentionResolver = Arc<dyn Fn(&FeedSource) -> u32 + Send + Sync>;

/// Effective retention: the override if present, else the global default.
pub fn resolve_retention(source_override: Option<u32>, global_default: u32) -> u32 {
    source_override.unwrap_or(global_default)
}

/// Build a resolver that applies [`resolve_retention`] with a fixed default.
pub fn retention_resolver(global_default: u32) -> RetentionResolver {
    Arc::new(move |source: &FeedSource| {
        resolve_retention(source.retention_days, global_default)
    })
}

/// Resolve through an optional resolver, falling back to
/// [`DEFAULT_RETENTION_DAYS`].
pub fn retention_for(resolver: Option<&RetentionResolver>, source: &FeedSource) -> u32 {
    resolver.map_or(DEFAULT_RETENTION_DAYS, |resolve| resolve(source))
}

/// Oldest publish time still inside a `days`-long window ending at `now`.
///
/// Windows reaching past the representable range saturate at
/// [`DateTime::<Utc>::MIN_UTC`], so everything falls inside them.
pub fn retention_cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
