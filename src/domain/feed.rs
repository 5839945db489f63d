use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    /// The user who added the feed. Anyone may follow it.
    pub user_id: Uuid,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feed {
    pub fn is_fetched(&self) -> bool {
        self.last_fetched_at.is_some()
    }
}

/// Fields supplied by `addfeed`; the store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
}

impl NewFeed {
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    pub feed: Feed,
    pub owner_name: Option<String>,
}
