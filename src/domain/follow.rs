use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A user following a feed, joined with both names for display.
#[derive(Debug, Clone)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: Uuid,
    pub feed_id: i64,
    pub user_name: String,
    pub feed_name: String,
    pub created_at: DateTime<Utc>,
}
