//! Error taxonomy shared across the crate.
//!
//! Every failure is scoped to the operation that raised it; nothing here
//! is fatal to the process. Route handlers map these variants onto HTTP
//! status codes in `routes::respond_error`.

use thiserror::Error;

/// Errors surfaced by Wayside operations
#[derive(Debug, Error)]
pub enum WaysideError {
    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request was claimed by another provider first. Expected
    /// outcome of losing a claim race, distinct from NotFound.
    #[error("request already claimed by another provider")]
    AlreadyClaimed,

    /// Settlement proof did not match the expected keyed hash
    #[error("invalid payment signature")]
    InvalidSignature,

    /// Malformed or incomplete input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing or invalid credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Authenticated, but the caller's role does not permit the operation
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Entity store failure
    #[error("database error: {0}")]
    Database(String),

    /// The external payment gateway did not respond or refused the call
    #[error("upstream gateway error: {0}")]
    Upstream(String),

    /// Transport-level failure (body read, JSON parse)
    #[error("http error: {0}")]
    Http(String),
}

impl From<std::io::Error> for WaysideError {
    fn from(e: std::io::Error) -> Self {
        WaysideError::Http(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, WaysideError>;
