use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use uuid::Uuid;

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, Post, User};
use crate::store::Store;

const FEED_COLUMNS: &str =
    "f.id, f.name, f.url, f.user_id, f.last_fetched_at, f.created_at, f.updated_at";

const FOLLOW_SELECT: &str = "SELECT ff.id, ff.user_id, ff.feed_id, u.name, f.name, ff.created_at
     FROM feed_follows ff
     JOIN users u ON u.id = ff.user_id
     JOIN feeds f ON f.id = ff.feed_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| GatorError::LockPoisoned)
    }

    /// Fixed-width UTC so that text comparison in SQL is chronological.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| s.parse::<DateTime<Utc>>())
    }

    fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let text: String = row.get(idx)?;
        Self::parse_datetime(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn optional_datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
        match row.get::<_, Option<String>>(idx)? {
            Some(_) => Self::datetime_at(row, idx).map(Some),
            None => Ok(None),
        }
    }

    fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
        let text: String = row.get(idx)?;
        Uuid::parse_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: Self::uuid_at(row, 0)?,
            name: row.get(1)?,
            created_at: Self::datetime_at(row, 2)?,
            updated_at: Self::datetime_at(row, 3)?,
        })
    }

    fn map_feed(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: Self::uuid_at(row, 3)?,
            last_fetched_at: Self::optional_datetime_at(row, 4)?,
            created_at: Self::datetime_at(row, 5)?,
            updated_at: Self::datetime_at(row, 6)?,
        })
    }

    fn map_follow(row: &Row<'_>) -> rusqlite::Result<FeedFollow> {
        Ok(FeedFollow {
            id: row.get(0)?,
            user_id: Self::uuid_at(row, 1)?,
            feed_id: row.get(2)?,
            user_name: row.get(3)?,
            feed_name: row.get(4)?,
            created_at: Self::datetime_at(row, 5)?,
        })
    }

    fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
        Ok(Post {
            id: Self::uuid_at(row, 0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            published_at: Self::optional_datetime_at(row, 5)?,
            created_at: Self::datetime_at(row, 6)?,
            updated_at: Self::datetime_at(row, 7)?,
        })
    }
}

#[cfg(test)]
impl SqliteStore {
    pub(crate) fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = ?1"),
                params![id],
                Self::map_feed,
            )
            .optional()?;

        Ok(feed)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

impl Store for SqliteStore {
    fn create_user(&self, name: &str) -> Result<User> {
        let conn = self.conn()?;
        let user = User::new(name);

        conn.execute(
            "INSERT INTO users (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.name,
                Self::format_datetime(&user.created_at),
                Self::format_datetime(&user.updated_at)
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::DuplicateUser(name.to_string())
            } else {
                GatorError::Database(e)
            }
        })?;

        Ok(user)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let user = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
                params![name],
                Self::map_user,
            )
            .optional()?;

        Ok(user)
    }

    fn get_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], Self::map_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn delete_all_users(&self) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM users", [])?;
        Ok(deleted)
    }

    fn create_feed(&self, feed: &NewFeed) -> Result<Feed> {
        let conn = self.conn()?;
        let now = Utc::now();
        let stamp = Self::format_datetime(&now);

        conn.execute(
            "INSERT INTO feeds (name, url, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![feed.name, feed.url, feed.user_id.to_string(), stamp],
        )?;

        Ok(Feed {
            id: conn.last_insert_rowid(),
            name: feed.name.clone(),
            url: feed.url.clone(),
            user_id: feed.user_id,
            last_fetched_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        // URLs are not unique; the oldest registration wins.
        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.url = ?1 ORDER BY f.id LIMIT 1"),
                params![url],
                Self::map_feed,
            )
            .optional()?;

        Ok(feed)
    }

    fn get_feeds_with_owner(&self) -> Result<Vec<FeedWithOwner>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS}, u.name
             FROM feeds f LEFT JOIN users u ON u.id = f.user_id
             ORDER BY f.id"
        ))?;

        let feeds = stmt
            .query_map([], |row| {
                Ok(FeedWithOwner {
                    feed: Self::map_feed(row)?,
                    owner_name: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn create_feed_follow(&self, user_id: Uuid, feed_id: i64) -> Result<FeedFollow> {
        let conn = self.conn()?;
        let stamp = Self::format_datetime(&Utc::now());

        let inserted = conn.execute(
            "INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![user_id.to_string(), feed_id, stamp],
        );

        if let Err(e) = inserted {
            if !is_unique_violation(&e) {
                return Err(e.into());
            }
            let (user, url) = conn
                .query_row(
                    "SELECT u.name, f.url FROM users u, feeds f WHERE u.id = ?1 AND f.id = ?2",
                    params![user_id.to_string(), feed_id],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?
                .unwrap_or_else(|| (user_id.to_string(), feed_id.to_string()));
            return Err(GatorError::DuplicateFollow { user, url });
        }

        let follow = conn.query_row(
            &format!("{FOLLOW_SELECT} WHERE ff.id = ?1"),
            params![conn.last_insert_rowid()],
            Self::map_follow,
        )?;

        Ok(follow)
    }

    fn delete_feed_follow(&self, user_id: Uuid, feed_id: i64) -> Result<bool> {
        let conn = self.conn()?;

        let deleted = conn.execute(
            "DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2",
            params![user_id.to_string(), feed_id],
        )?;

        Ok(deleted > 0)
    }

    fn get_feed_follows_for_user(&self, user_id: Uuid) -> Result<Vec<FeedFollow>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!("{FOLLOW_SELECT} WHERE ff.user_id = ?1 ORDER BY ff.id"))?;
        let follows = stmt
            .query_map(params![user_id.to_string()], Self::map_follow)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(follows)
    }

    fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        // Never-fetched feeds first, then least recently fetched, then id.
        let feed = conn
            .query_row(
                &format!(
                    "SELECT {FEED_COLUMNS} FROM feeds f
                     ORDER BY f.last_fetched_at IS NOT NULL, f.last_fetched_at ASC, f.id ASC
                     LIMIT 1"
                ),
                [],
                Self::map_feed,
            )
            .optional()?;

        Ok(feed)
    }

    fn mark_feed_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let stamp = Self::format_datetime(&at);

        // last_fetched_at never moves backwards, even if the clock does.
        let updated = conn.execute(
            "UPDATE feeds
             SET last_fetched_at = CASE
                     WHEN last_fetched_at IS NULL OR last_fetched_at < ?1 THEN ?1
                     ELSE last_fetched_at
                 END,
                 updated_at = ?1
             WHERE id = ?2",
            params![stamp, feed_id],
        )?;

        if updated == 0 {
            return Err(GatorError::FeedNotFound(feed_id.to_string()));
        }

        Ok(())
    }

    fn create_post(&self, post: &NewPost) -> Result<()> {
        let conn = self.conn()?;
        let stamp = Self::format_datetime(&Utc::now());

        conn.execute(
            "INSERT INTO posts (id, feed_id, title, url, description, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                post.id.to_string(),
                post.feed_id,
                post.title,
                post.url,
                post.description,
                post.published_at.as_ref().map(Self::format_datetime),
                stamp
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::DuplicatePost(post.url.clone())
            } else {
                GatorError::Database(e)
            }
        })?;

        Ok(())
    }

    fn get_posts_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut stmt = conn.prepare(
            "SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at, p.created_at, p.updated_at
             FROM posts p
             JOIN feed_follows ff ON ff.feed_id = p.feed_id
             WHERE ff.user_id = ?1
             ORDER BY p.published_at IS NULL, p.published_at DESC, p.created_at DESC
             LIMIT ?2",
        )?;

        let posts = stmt
            .query_map(params![user_id.to_string(), limit], Self::map_post)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }
}
