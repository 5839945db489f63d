pub mod context;
pub mod error;

pub use context::{ExecutionState, Session};
pub use error::{ErrorKind, GatorError, Result};
