use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const UNTITLED: &str = "(untitled)";

#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post about to be inserted. The id is generated up front so a
/// duplicate insert never reuses an existing identity.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: Uuid,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    pub fn new(feed_id: i64, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            feed_id,
            title: UNTITLED.to_string(),
            url: url.into(),
            description: None,
            published_at: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            self.title = title;
        }
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}
