//! Route registration errors.

use thiserror::Error;

/// Errors raised when registering patterns or building queries from params.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("pattern {0:?} is already registered")]
    DuplicatePattern(String),

    #[error("placeholder :{name} appears more than once in {pattern:?}")]
    DuplicateParam { pattern: String, name: String },

    #[error("missing route param :{name} for {pattern:?}")]
    MissingParam { pattern: String, name: String },
}
