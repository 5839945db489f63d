//! # Gator
//!
//! A command-line RSS feed aggregator.
//!
//! Users register, add and follow feeds, and run `gator agg` to poll the
//! feeds one at a time on a fixed interval. Every fetched entry is stored
//! once as a post, ready for `gator browse`.
//!
//! ## Architecture
//!
//! ```text
//! CLI → Router → (login middleware) → handler → Store / Ingestor
//!                                      agg → Poller → Ingestor → Fetcher → Normalizer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! gator register alice
//! gator addfeed "Rust Blog" https://blog.rust-lang.org/feed.xml
//! gator agg 1m
//! gator browse 10
//! ```

/// Execution state and error types.
///
/// [`ExecutionState`](app::ExecutionState) is built once per process and
/// handed to every command.
pub mod app;

/// Feed ingestion and polling.
///
/// - [`Ingestor`](aggregator::Ingestor): one feed per `run_once`
/// - [`Poller`](aggregator::Poller): runs the ingestor on an interval
pub mod aggregator;

/// Command-line front end: clap parser, command router, handlers.
pub mod cli;

/// The `~/.gatorconfig.json` record and access to it.
pub mod config;

/// Core domain models: users, feeds, follows, posts.
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Feed parsing and normalization.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0 documents
/// into [`RawItem`](fetcher::RawItem)s.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
