pub mod sqlite;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::app::Result;
use crate::domain::{Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, Post, User};

pub use sqlite::SqliteStore;

pub trait Store {
    // User operations
    fn create_user(&self, name: &str) -> Result<User>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn get_users(&self) -> Result<Vec<User>>;
    fn delete_all_users(&self) -> Result<usize>;

    // Feed operations
    fn create_feed(&self, feed: &NewFeed) -> Result<Feed>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn get_feeds_with_owner(&self) -> Result<Vec<FeedWithOwner>>;

    // Follow operations
    fn create_feed_follow(&self, user_id: Uuid, feed_id: i64) -> Result<FeedFollow>;
    fn delete_feed_follow(&self, user_id: Uuid, feed_id: i64) -> Result<bool>;
    fn get_feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>>;

    // Scheduling operations
    fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>>;
    fn mark_feed_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()>;

    // Post operations
    fn create_post(&self, post: &NewPost) -> Result<()>;
    fn get_posts_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Post>>;
}
