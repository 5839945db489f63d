pub mod commands;
pub mod router;

use std::path::PathBuf;

use clap::Parser;

use crate::app::{GatorError, Result};

pub use router::{CommandHandler, Handler, Router, UserCommandHandler};

#[derive(Parser)]
#[command(name = "gator")]
#[command(about = "A command-line RSS feed aggregator", long_about = None)]
#[command(after_help = "Commands:
  register <name>        Create a user and log in as them
  login <name>           Log in as an existing user
  reset                  Delete all users, feeds and posts
  users                  List users
  agg <interval>         Fetch feeds forever, one every <interval> (e.g. 1m)
  addfeed <name> <url>   Add a feed and follow it
  feeds                  List all feeds
  follow <url>           Follow an existing feed
  unfollow <url>         Stop following a feed
  following              List followed feeds
  browse [limit]         Show the newest posts (default 2)")]
pub struct Cli {
    /// Path to the configuration file (default: ~/.gatorconfig.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command name followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub args: Vec<String>,
}

impl Cli {
    pub fn command(&self) -> Result<Command> {
        let (name, args) = self.args.split_first().ok_or(GatorError::NoCommand)?;
        Ok(Command::new(name.clone(), args.to_vec()))
    }
}

/// A named invocation with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The arguments, provided there are exactly `count` of them.
    pub fn expect_args(&self, count: usize, usage: &str) -> Result<&[String]> {
        if self.args.len() == count {
            Ok(&self.args)
        } else {
            Err(GatorError::Usage(usage.to_string()))
        }
    }
}

/// The router with every gator command registered.
pub fn router() -> Router {
    use commands::*;

    let mut router = Router::new();
    router.register("login", Handler::plain(Login));
    router.register("register", Handler::plain(Register));
    router.register("reset", Handler::plain(Reset));
    router.register("users", Handler::plain(Users));
    router.register("agg", Handler::plain(Aggregate));
    router.register("addfeed", Handler::logged_in(AddFeed));
    router.register("feeds", Handler::plain(Feeds));
    router.register("follow", Handler::logged_in(Follow));
    router.register("unfollow", Handler::logged_in(Unfollow));
    router.register("following", Handler::logged_in(Following));
    router.register("browse", Handler::logged_in(Browse));
    router
}
