//! Crate-wide error types.
//!
//! Components below the Dispatcher surface these typed errors; only the
//! Dispatcher (and the admin handlers) translate them into HTTP
//! responses.

use thiserror::Error;

/// Errors surfaced by the backend pool and policy layer.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no servers")]
    NoServers,

    #[error("unable to update: {0}")]
    UnableToUpdate(String),

    #[error("server with such url already present: {0}")]
    DuplicateUrl(String),

    #[error("invalid backend url: {0}")]
    BrokenUrl(String),
}

/// Errors surfaced by the token-bucket rate limiter.
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("failed to register client: {0}")]
    AddIp(String),

    #[error("failed to remove client: {0}")]
    RemoveIp(String),
}
