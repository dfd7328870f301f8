//! Retention sweep over the article cache.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::feed::retention::{retention_cutoff, retention_for, RetentionResolver};
use crate::feed::types::{Article, FeedSource};
use crate::store::ArticleStore;

/// Remove articles published before each source's retention window, as of
/// now. Returns the number removed.
pub fn expire_old(
    sources: &[FeedSource],
    store: &mut ArticleStore,
    resolver: Option<&RetentionResolver>,
) -> usize {
    expire_old_at(sources, store, resolver, Utc::now())
}

/// Remove articles published strictly before `now - retention`.
///
/// Surviving articles keep their order. Read state is not consulted.
pub fn expire_old_at(
    sources: &[FeedSource],
    store: &mut ArticleStore,
    resolver: Option<&RetentionResolver>,
    now: DateTime<Utc>,
) -> usize {
    let mut removed = 0;

    for source in sources {
        let days = retention_for(resolver, source);
        let cutoff = retention_cutoff(now, days);

        let current = store.articles_for(source.key());
        let kept: Vec<Article> = current
            .iter()
            .filter(|a| a.published_at >= cutoff)
            .cloned()
            .collect();

        let dropped = current.len() - kept.len();
        if dropped == 0 {
            continue;
        }

        debug!("{}: expired {} article(s) older than {} days", source.name, dropped, days);
        store.set_articles(source.key(), kept);
        removed += dropped;
    }

    if removed > 0 {
        info!("Expired {} article(s)", removed);
    }
    removed
}
