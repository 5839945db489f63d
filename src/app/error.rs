use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("usage: {0}")]
    Usage(String),

    #[error("No command provided")]
    NoCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("User {user} is not following {url}")]
    NotFollowing { user: String, url: String },

    #[error("No feeds configured")]
    NoFeedsConfigured,

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("User {user} already follows {url}")]
    DuplicateFollow { user: String, url: String },

    #[error("Post already stored: {0}")]
    DuplicatePost(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid publication date: {0}")]
    InvalidPubDate(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error category, used to decide how far an error propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments; the user can fix the invocation.
    Usage,
    NotFound,
    /// Unique-constraint violation.
    Duplicate,
    Store,
    /// Network or feed-decode failure for one feed.
    Fetch,
    /// A single malformed value (item date, duration, limit, URL).
    Parse,
    Config,
}

impl GatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatorError::Usage(_) | GatorError::NoCommand => ErrorKind::Usage,
            GatorError::UnknownCommand(_)
            | GatorError::UserNotFound(_)
            | GatorError::FeedNotFound(_)
            | GatorError::NotFollowing { .. }
            | GatorError::NoFeedsConfigured => ErrorKind::NotFound,
            GatorError::DuplicateUser(_)
            | GatorError::DuplicateFollow { .. }
            | GatorError::DuplicatePost(_) => ErrorKind::Duplicate,
            GatorError::Database(_) | GatorError::Migration(_) | GatorError::LockPoisoned => {
                ErrorKind::Store
            }
            GatorError::Http(_) | GatorError::FeedParse(_) => ErrorKind::Fetch,
            GatorError::InvalidUrl(_)
            | GatorError::InvalidPubDate(_)
            | GatorError::InvalidInterval(_)
            | GatorError::InvalidLimit(_) => ErrorKind::Parse,
            GatorError::Io(_) | GatorError::Json(_) | GatorError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::Duplicate
    }
}

pub type Result<T> = std::result::Result<T, GatorError>;
