//! Feed ingestion.
//!
//! [`Ingestor::run_once`] advances polling by exactly one feed: it picks the
//! feed that has waited longest (never-fetched feeds first), stamps it as
//! fetched *before* touching the network, downloads it, and stores each
//! item as a post. A bad item is skipped; a bad feed only ends its own
//! cycle. [`Poller`] drives `run_once` on a fixed interval.

pub mod interval;
pub mod poller;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::app::{GatorError, Result};
use crate::domain::{Feed, NewPost};
use crate::fetcher::{Fetcher, RawItem, PUB_DATE_FORMAT};
use crate::store::Store;

pub use interval::{format_interval, parse_interval};
pub use poller::{PollSummary, Poller, StopHandle};

/// Outcome of a single ingestion cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub feed_id: i64,
    pub feed_name: String,
    /// New posts stored.
    pub inserted: usize,
    /// Items whose URL was already stored for this feed.
    pub duplicates: usize,
    /// Items dropped before insert (bad date, no link).
    pub skipped: usize,
    /// Inserts that failed for reasons other than a duplicate.
    pub failed: usize,
}

impl CycleReport {
    fn new(feed: &Feed) -> Self {
        Self {
            feed_id: feed.id,
            feed_name: feed.name.clone(),
            ..Default::default()
        }
    }
}

pub struct Ingestor<S> {
    store: Arc<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl<S: Store + Send + Sync> Ingestor<S> {
    pub fn new(store: Arc<S>, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self { store, fetcher }
    }

    pub async fn run_once(&self) -> Result<CycleReport> {
        let feed = self
            .store
            .get_next_feed_to_fetch()?
            .ok_or(GatorError::NoFeedsConfigured)?;

        // Committed before the fetch so a failing feed waits its turn.
        self.store.mark_feed_fetched(feed.id, Utc::now())?;

        tracing::info!(
            feed = %feed.name,
            url = %feed.url,
            first_fetch = !feed.is_fetched(),
            "Fetching feed"
        );
        let fetched = self.fetcher.fetch(&feed.url).await?;
        if let Some(title) = fetched.title.as_deref() {
            tracing::debug!(feed = %feed.name, title, "Fetched channel");
        }

        let mut report = CycleReport::new(&feed);
        for item in fetched.items {
            self.ingest_item(&feed, item, &mut report);
        }

        tracing::info!(
            feed = %feed.name,
            inserted = report.inserted,
            duplicates = report.duplicates,
            skipped = report.skipped,
            failed = report.failed,
            "Feed cycle complete"
        );
        Ok(report)
    }

    fn ingest_item(&self, feed: &Feed, item: RawItem, report: &mut CycleReport) {
        let published_at = match parse_pub_date(item.pub_date.as_deref()) {
            Ok(dt) => dt,
            Err(e) => {
                tracing::warn!(feed = %feed.name, link = ?item.link, "Skipping item: {}", e);
                report.skipped += 1;
                return;
            }
        };

        let Some(link) = item.link.filter(|l| !l.trim().is_empty()) else {
            tracing::warn!(feed = %feed.name, title = ?item.title, "Skipping item without a link");
            report.skipped += 1;
            return;
        };

        let post = NewPost::new(feed.id, link)
            .with_title(item.title)
            .with_description(item.description)
            .with_published_at(published_at);

        match self.store.create_post(&post) {
            Ok(()) => report.inserted += 1,
            Err(e) if e.is_duplicate() => {
                tracing::debug!(url = %post.url, "Post already stored");
                report.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(url = %post.url, "Failed to store post: {}", e);
                report.failed += 1;
            }
        }
    }
}

/// Parse an item's publication date; the layout is fixed.
pub fn parse_pub_date(value: Option<&str>) -> Result<DateTime<Utc>> {
    let text = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatorError::InvalidPubDate("missing".into()))?;

    DateTime::parse_from_str(text, PUB_DATE_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GatorError::InvalidPubDate(format!("{:?}: {}", text, e)))
}
