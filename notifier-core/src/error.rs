//! Error types for the notifier.
//!
//! [`NotifierError`] is the top-level error; [`HandlerError`] is used for per-event handler failures.

use std::time::Duration;

use thiserror::Error;

/// Top-level error (config, connection, handler, bot transport, shutdown, IO).
#[derive(Error, Debug)]
pub enum NotifierError {
    /// Missing, unreadable or malformed configuration. Always fatal.
    #[error("Config error: {0}")]
    Config(String),

    /// Network failure. Fatal during startup, local to one event otherwise.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    /// The remote bot API answered but rejected the call.
    #[error("Bot error: {0}")]
    Bot(String),

    /// An event source stopped with an unrecoverable failure.
    #[error("Event source error: {0}")]
    Source(String),

    #[error("Shutdown timed out after {0:?}; in-flight work was abandoned")]
    ShutdownTimeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while handling a single event.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for NotifierError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest includes the request URL in its message; the Telegram URL carries the token.
        NotifierError::Connection(e.without_url().to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::InvalidPayload(e.to_string())
    }
}

/// Result type for core operations; uses [`NotifierError`].
pub type Result<T> = std::result::Result<T, NotifierError>;
