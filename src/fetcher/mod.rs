pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

/// Layout of `RawItem::pub_date`, e.g. `Mon, 02 Jan 2006 15:04:05 +0000`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// One entry of a fetched feed, before it becomes a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    /// Publication date in the `PUB_DATE_FORMAT` layout, as text.
    pub pub_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchedFeed {
    pub title: Option<String>,
    pub items: Vec<RawItem>,
}

#[async_trait]
pub trait Fetcher {
    /// Download and decode the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<FetchedFeed>;
}
