use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{GatorError, Result};
use crate::fetcher::{FetchedFeed, RawItem, PUB_DATE_FORMAT};

/// Turns RSS/Atom/JSON Feed documents into [`FetchedFeed`]s.
#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, body: &[u8]) -> Result<FetchedFeed> {
        let feed = parser::parse(body).map_err(|e| GatorError::FeedParse(e.to_string()))?;

        let items = feed
            .entries
            .into_iter()
            .map(|entry| {
                let description = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body));

                RawItem {
                    title: entry
                        .title
                        .map(|t| decode_html_entities(&t.content).to_string()),
                    link: entry.links.first().map(|l| l.href.clone()),
                    description: description.map(|d| decode_html_entities(&d).to_string()),
                    pub_date: entry
                        .published
                        .or(entry.updated)
                        .map(|dt| dt.format(PUB_DATE_FORMAT).to_string()),
                }
            })
            .collect();

        Ok(FetchedFeed {
            title: feed
                .title
                .map(|t| decode_html_entities(&t.content).to_string()),
            items,
        })
    }
}
