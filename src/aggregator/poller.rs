use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::aggregator::{format_interval, Ingestor};
use crate::app::GatorError;
use crate::store::Store;

/// Cloneable handle that ends a running [`Poller`].
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub ticks: u64,
    /// Ticks whose cycle returned an error.
    pub failures: u64,
}

/// Runs one ingestion cycle per tick, strictly one after another.
///
/// The first cycle starts immediately; later ones follow every `every`.
/// A slow cycle delays the next tick rather than causing a burst.
pub struct Poller<S> {
    ingestor: Ingestor<S>,
    every: Duration,
    tick_limit: Option<u64>,
    stop: Arc<watch::Sender<bool>>,
}

impl<S: Store + Send + Sync> Poller<S> {
    pub fn new(ingestor: Ingestor<S>, every: Duration) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            ingestor,
            every,
            tick_limit: None,
            stop: Arc::new(tx),
        }
    }

    /// Stop after `ticks` cycles instead of running until stopped.
    pub fn with_tick_limit(mut self, ticks: u64) -> Self {
        self.tick_limit = Some(ticks);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop.clone(),
        }
    }

    pub async fn run(&self) -> PollSummary {
        let mut stop = self.stop.subscribe();
        let mut timer = interval(self.every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = PollSummary::default();

        tracing::info!(every = %format_interval(self.every), "Poller started");

        loop {
            if *stop.borrow_and_update() {
                break;
            }
            if self.tick_limit.is_some_and(|limit| summary.ticks >= limit) {
                break;
            }

            tokio::select! {
                _ = timer.tick() => {}
                _ = stop.changed() => continue,
            }

            summary.ticks += 1;
            match self.ingestor.run_once().await {
                Ok(report) => {
                    tracing::debug!(feed = %report.feed_name, tick = summary.ticks, "Tick done");
                }
                Err(GatorError::NoFeedsConfigured) => {
                    summary.failures += 1;
                    tracing::warn!("No feeds to fetch; add one with `addfeed`");
                }
                Err(e) => {
                    summary.failures += 1;
                    tracing::warn!(tick = summary.ticks, "Feed cycle failed: {}", e);
                }
            }
        }

        tracing::info!(
            ticks = summary.ticks,
            failures = summary.failures,
            "Poller stopped"
        );
        summary
    }
}
