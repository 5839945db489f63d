use async_trait::async_trait;
use url::Url;

use crate::aggregator::{format_interval, parse_interval, Ingestor, Poller};
use crate::app::{ExecutionState, GatorError, Result};
use crate::cli::{Command, CommandHandler, UserCommandHandler};
use crate::domain::{Feed, NewFeed, Post, User};
use crate::store::Store;

pub const DEFAULT_BROWSE_LIMIT: usize = 2;

pub struct Login;

#[async_trait]
impl CommandHandler for Login {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()> {
        let name = &cmd.expect_args(1, "login <name>")?[0];

        let user = state
            .store
            .get_user_by_name(name)?
            .ok_or_else(|| GatorError::UserNotFound(name.clone()))?;

        state.set_current_user(&user.name)?;
        println!("Logged in as {}", user.name);
        Ok(())
    }
}

pub struct Register;

#[async_trait]
impl CommandHandler for Register {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()> {
        let name = &cmd.expect_args(1, "register <name>")?[0];

        let user = state.store.create_user(name)?;
        tracing::info!(user = %user.name, id = %user.id, "User registered");

        state.set_current_user(&user.name)?;
        println!("Registered and logged in as {}", user.name);
        Ok(())
    }
}

pub struct Reset;

#[async_trait]
impl CommandHandler for Reset {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()> {
        cmd.expect_args(0, "reset")?;

        let deleted = state.store.delete_all_users()?;
        println!("Deleted {} users and everything they owned", deleted);
        Ok(())
    }
}

pub struct Users;

#[async_trait]
impl CommandHandler for Users {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()> {
        cmd.expect_args(0, "users")?;

        let users = state.store.get_users()?;
        if users.is_empty() {
            println!("No users");
            return Ok(());
        }

        let current = state.session.current_user();
        for user in users {
            let marker = if current == Some(user.name.as_str()) {
                " (current)"
            } else {
                ""
            };
            println!("* {}{}", user.name, marker);
        }
        Ok(())
    }
}

pub struct Aggregate;

#[async_trait]
impl CommandHandler for Aggregate {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()> {
        let every = parse_interval(&cmd.expect_args(1, "agg <time_between_reqs>")?[0])?;

        let ingestor = Ingestor::new(state.store.clone(), state.fetcher.clone());
        let poller = Poller::new(ingestor, every);

        let stop = poller.stop_handle();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.stop();
            }
        });

        println!("Collecting feeds every {}", format_interval(every));
        let summary = poller.run().await;
        signal_task.abort();

        println!(
            "Stopped after {} fetches ({} failed)",
            summary.ticks, summary.failures
        );
        Ok(())
    }
}

pub struct AddFeed;

#[async_trait]
impl UserCommandHandler for AddFeed {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command, user: User) -> Result<()> {
        let args = cmd.expect_args(2, "addfeed <name> <url>")?;
        let (name, url) = (&args[0], &args[1]);
        Url::parse(url)?;

        let feed = state
            .store
            .create_feed(&NewFeed::new(name.as_str(), url.as_str(), user.id))?;
        println!("Added feed {} ({})", feed.name, feed.url);

        let follow = state.store.create_feed_follow(user.id, feed.id)?;
        println!("{} now follows {}", follow.user_name, follow.feed_name);
        Ok(())
    }
}

pub struct Feeds;

#[async_trait]
impl CommandHandler for Feeds {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()> {
        cmd.expect_args(0, "feeds")?;

        let feeds = state.store.get_feeds_with_owner()?;
        if feeds.is_empty() {
            println!("No feeds");
            return Ok(());
        }

        for entry in feeds {
            let fetched = entry
                .feed
                .last_fetched_at
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "* {} ({}) by {}, last fetched {}",
                entry.feed.name,
                entry.feed.url,
                entry.owner_name.as_deref().unwrap_or("unknown"),
                fetched
            );
        }
        Ok(())
    }
}

fn feed_by_url(state: &ExecutionState, url: &str) -> Result<Feed> {
    state
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| GatorError::FeedNotFound(url.to_string()))
}

pub struct Follow;

#[async_trait]
impl UserCommandHandler for Follow {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command, user: User) -> Result<()> {
        let url = &cmd.expect_args(1, "follow <url>")?[0];
        let feed = feed_by_url(state, url)?;

        let follow = state.store.create_feed_follow(user.id, feed.id)?;
        println!("{} now follows {}", follow.user_name, follow.feed_name);
        Ok(())
    }
}

pub struct Unfollow;

#[async_trait]
impl UserCommandHandler for Unfollow {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command, user: User) -> Result<()> {
        let url = &cmd.expect_args(1, "unfollow <url>")?[0];
        let feed = feed_by_url(state, url)?;

        if !state.store.delete_feed_follow(user.id, feed.id)? {
            return Err(GatorError::NotFollowing {
                user: user.name,
                url: url.clone(),
            });
        }
        println!("{} unfollowed {}", user.name, feed.name);
        Ok(())
    }
}

pub struct Following;

#[async_trait]
impl UserCommandHandler for Following {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command, user: User) -> Result<()> {
        cmd.expect_args(0, "following")?;

        let follows = state.store.get_feed_follows_for_user(user.id)?;
        if follows.is_empty() {
            println!("{} follows no feeds", user.name);
            return Ok(());
        }

        println!("{} follows:", user.name);
        for follow in follows {
            println!("* {}", follow.feed_name);
        }
        Ok(())
    }
}

/// Parse `browse`'s optional limit argument.
pub fn parse_limit(arg: Option<&str>) -> Result<usize> {
    match arg {
        None => Ok(DEFAULT_BROWSE_LIMIT),
        Some(text) => text
            .trim()
            .parse()
            .map_err(|_| GatorError::InvalidLimit(text.to_string())),
    }
}

/// The posts `browse` shows for `user`: at most `limit` of the newest,
/// fewer when fewer exist.
pub fn browse_posts(state: &ExecutionState, user: &User, args: &[String]) -> Result<Vec<Post>> {
    if args.len() > 1 {
        return Err(GatorError::Usage("browse [limit]".into()));
    }
    let limit = parse_limit(args.first().map(String::as_str))?;
    state.store.get_posts_for_user(user.id, limit)
}

pub struct Browse;

#[async_trait]
impl UserCommandHandler for Browse {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command, user: User) -> Result<()> {
        let posts = browse_posts(state, &user, &cmd.args)?;
        if posts.is_empty() {
            println!("No posts yet");
            return Ok(());
        }

        for post in posts {
            let date = post
                .published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "          ".to_string());
            println!("{} {}\n  {}", date, post.title, post.url);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::app::ErrorKind;
    use crate::cli::router;
    use crate::config::{Config, MemoryConfigStore};
    use crate::domain::NewPost;
    use crate::fetcher::testing::StubFetcher;
    use crate::store::SqliteStore;

    const FEED_URL: &str = "https://example.com/feed.xml";

    fn state() -> ExecutionState {
        ExecutionState::with_parts(
            Arc::new(SqliteStore::in_memory().unwrap()),
            Arc::new(StubFetcher::new()),
            Box::new(MemoryConfigStore::new(Config::default())),
        )
    }

    async fn run(state: &mut ExecutionState, line: &[&str]) -> Result<()> {
        let (name, args) = line.split_first().unwrap();
        let args = args.iter().map(|a| a.to_string()).collect();
        router().run(state, &Command::new(*name, args)).await
    }

    #[tokio::test]
    async fn test_register_logs_in() {
        let mut state = state();

        assert_ok!(run(&mut state, &["register", "alice"]).await);

        assert_eq!(state.session.current_user(), Some("alice"));
        assert!(state.store.get_user_by_name("alice").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_register_keeps_current_user() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();
        run(&mut state, &["register", "bob"]).await.unwrap();

        let err = run(&mut state, &["register", "alice"]).await.unwrap_err();
        assert!(matches!(err, GatorError::DuplicateUser(_)));
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(state.session.current_user(), Some("bob"));
    }

    #[tokio::test]
    async fn test_login() {
        let mut state = state();
        state.store.create_user("alice").unwrap();

        let err = run(&mut state, &["login", "bob"]).await.unwrap_err();
        assert!(matches!(err, GatorError::UserNotFound(_)));
        assert_eq!(state.session.current_user(), None);

        run(&mut state, &["login", "alice"]).await.unwrap();
        assert_eq!(state.session.current_user(), Some("alice"));
    }

    #[tokio::test]
    async fn test_arity_is_checked() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();

        for line in [
            &["login"][..],
            &["register", "a", "b"],
            &["reset", "now"],
            &["users", "all"],
            &["agg"],
            &["addfeed", "Tech"],
            &["feeds", "x"],
            &["follow"],
            &["unfollow"],
            &["following", "x"],
            &["browse", "1", "2"],
        ] {
            let err = run(&mut state, line).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage, "{:?}", line);
        }
    }

    #[tokio::test]
    async fn test_reset_deletes_everything() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();
        run(&mut state, &["addfeed", "Tech", FEED_URL]).await.unwrap();

        run(&mut state, &["reset"]).await.unwrap();

        assert!(state.store.get_users().unwrap().is_empty());
        assert!(state.store.get_feeds_with_owner().unwrap().is_empty());
        assert_ok!(run(&mut state, &["users"]).await);
    }

    #[tokio::test]
    async fn test_logged_in_commands_need_a_known_user() {
        let mut state = state();

        for line in [
            &["addfeed", "Tech", FEED_URL][..],
            &["follow", FEED_URL],
            &["unfollow", FEED_URL],
            &["following"],
            &["browse"],
        ] {
            let err = run(&mut state, line).await.unwrap_err();
            assert!(matches!(err, GatorError::UserNotFound(_)), "{:?}", line);
        }
        assert!(state.store.get_feeds_with_owner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_user_cannot_add_feeds() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();
        state.store.delete_all_users().unwrap();

        let err = run(&mut state, &["addfeed", "Tech", FEED_URL]).await.unwrap_err();
        assert!(matches!(err, GatorError::UserNotFound(ref name) if name == "alice"));
        assert!(state.store.get_feeds_with_owner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_addfeed_follows_as_creator() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();

        run(&mut state, &["addfeed", "Tech", FEED_URL]).await.unwrap();

        let alice = state.store.get_user_by_name("alice").unwrap().unwrap();
        let feed = state.store.get_feed_by_url(FEED_URL).unwrap().unwrap();
        assert_eq!(feed.name, "Tech");
        assert_eq!(feed.user_id, alice.id);
        assert!(feed.last_fetched_at.is_none());

        let follows = state.store.get_feed_follows_for_user(alice.id).unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].feed_id, feed.id);
    }

    #[tokio::test]
    async fn test_addfeed_rejects_bad_url() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();

        let err = run(&mut state, &["addfeed", "Tech", "not a url"]).await.unwrap_err();
        assert!(matches!(err, GatorError::InvalidUrl(_)));
        assert!(state.store.get_feeds_with_owner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follow_unfollow_cycle() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();
        run(&mut state, &["addfeed", "Tech", FEED_URL]).await.unwrap();
        run(&mut state, &["register", "bob"]).await.unwrap();
        let bob = state.store.get_user_by_name("bob").unwrap().unwrap();

        run(&mut state, &["follow", FEED_URL]).await.unwrap();
        assert_eq!(state.store.get_feed_follows_for_user(bob.id).unwrap().len(), 1);
        assert_ok!(run(&mut state, &["following"]).await);

        let err = run(&mut state, &["follow", FEED_URL]).await.unwrap_err();
        assert!(matches!(err, GatorError::DuplicateFollow { .. }));

        run(&mut state, &["unfollow", FEED_URL]).await.unwrap();
        assert!(state.store.get_feed_follows_for_user(bob.id).unwrap().is_empty());

        let err = run(&mut state, &["unfollow", FEED_URL]).await.unwrap_err();
        assert!(matches!(err, GatorError::NotFollowing { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_follow_unknown_feed() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();

        let err = run(&mut state, &["follow", "https://example.com/none.xml"])
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::FeedNotFound(_)));
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None).unwrap(), DEFAULT_BROWSE_LIMIT);
        assert_eq!(parse_limit(Some("10")).unwrap(), 10);
        assert!(matches!(parse_limit(Some("ten")), Err(GatorError::InvalidLimit(_))));
        assert!(matches!(parse_limit(Some("-1")), Err(GatorError::InvalidLimit(_))));
        assert!(matches!(parse_limit(Some("2.5")), Err(GatorError::InvalidLimit(_))));
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_browse_without_posts() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();
        let alice = state.store.get_user_by_name("alice").unwrap().unwrap();

        let posts = assert_ok!(browse_posts(&state, &alice, &[]));
        assert!(posts.is_empty());
        assert_ok!(run(&mut state, &["browse"]).await);
    }

    #[tokio::test]
    async fn test_browse_limit_beyond_available() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();
        run(&mut state, &["addfeed", "Tech", FEED_URL]).await.unwrap();
        let feed = state.store.get_feed_by_url(FEED_URL).unwrap().unwrap();
        for i in 0..3 {
            state
                .store
                .create_post(&NewPost::new(feed.id, format!("https://example.com/{}", i)))
                .unwrap();
        }

        let alice = state.store.get_user_by_name("alice").unwrap().unwrap();

        let all = assert_ok!(browse_posts(&state, &alice, &args(&["100"])));
        assert_eq!(all.len(), 3);

        let default = assert_ok!(browse_posts(&state, &alice, &[]));
        assert_eq!(default.len(), DEFAULT_BROWSE_LIMIT);

        let err = assert_err!(browse_posts(&state, &alice, &args(&["1", "2"])));
        assert_eq!(err.kind(), ErrorKind::Usage);

        assert_ok!(run(&mut state, &["browse", "100"]).await);
    }

    #[tokio::test]
    async fn test_browse_rejects_bad_limit() {
        let mut state = state();
        run(&mut state, &["register", "alice"]).await.unwrap();

        let err = assert_err!(run(&mut state, &["browse", "many"]).await);
        assert!(matches!(err, GatorError::InvalidLimit(_)));
    }

    #[tokio::test]
    async fn test_agg_rejects_bad_interval() {
        let mut state = state();

        let err = run(&mut state, &["agg", "soon"]).await.unwrap_err();
        assert!(matches!(err, GatorError::InvalidInterval(_)));
    }

    #[tokio::test]
    async fn test_listing_commands() {
        let mut state = state();
        assert_ok!(run(&mut state, &["users"]).await);
        assert_ok!(run(&mut state, &["feeds"]).await);

        run(&mut state, &["register", "alice"]).await.unwrap();
        run(&mut state, &["addfeed", "Tech", FEED_URL]).await.unwrap();
        assert_ok!(run(&mut state, &["users"]).await);
        assert_ok!(run(&mut state, &["feeds"]).await);
    }
}
