use std::collections::HashMap;

use async_trait::async_trait;

use crate::app::{ExecutionState, GatorError, Result};
use crate::cli::Command;
use crate::domain::User;
use crate::store::Store;

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()>;
}

/// A handler that needs to know who is logged in.
#[async_trait]
pub trait UserCommandHandler: Send + Sync {
    async fn run(&self, state: &mut ExecutionState, cmd: &Command, user: User) -> Result<()>;
}

pub enum Handler {
    Plain(Box<dyn CommandHandler>),
    /// Resolves the current user first; fails with `UserNotFound` otherwise.
    LoggedIn(Box<dyn UserCommandHandler>),
}

impl Handler {
    pub fn plain(handler: impl CommandHandler + 'static) -> Self {
        Handler::Plain(Box::new(handler))
    }

    pub fn logged_in(handler: impl UserCommandHandler + 'static) -> Self {
        Handler::LoggedIn(Box::new(handler))
    }

    pub async fn execute(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()> {
        match self {
            Handler::Plain(handler) => handler.run(state, cmd).await,
            Handler::LoggedIn(handler) => {
                let user = current_user(state)?;
                handler.run(state, cmd, user).await
            }
        }
    }
}

/// Look up the session's current user in the store.
pub fn current_user(state: &ExecutionState) -> Result<User> {
    let name = state
        .session
        .current_user()
        .ok_or_else(|| GatorError::UserNotFound("(nobody is logged in)".into()))?;

    state
        .store
        .get_user_by_name(name)?
        .ok_or_else(|| GatorError::UserNotFound(name.to_string()))
}

#[derive(Default)]
pub struct Router {
    handlers: HashMap<String, Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering a name twice replaces the earlier handler.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) {
        self.handlers.insert(name.into(), handler);
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub async fn run(&self, state: &mut ExecutionState, cmd: &Command) -> Result<()> {
        let handler = self
            .handlers
            .get(&cmd.name)
            .ok_or_else(|| GatorError::UnknownCommand(cmd.name.clone()))?;

        tracing::debug!(command = %cmd.name, args = ?cmd.args, "Running command");
        handler.execute(state, cmd).await
    }
}
