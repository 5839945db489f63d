use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::{FetchedFeed, Fetcher};
use crate::normalizer::Normalizer;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpFetcher {
    client: Client,
    normalizer: Normalizer,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// A hung server can only stall the poller for `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("gator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            normalizer: Normalizer::new(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed> {
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        let body = response.bytes().await?;
        tracing::debug!(url, bytes = body.len(), "Fetched feed body");

        self.normalizer.normalize(&body)
    }
}
