//! Shared HTTP session: one long-lived connection pool for all outbound requests.
//!
//! [`Session`] is owned by the runtime and is the only value that can close the pool.
//! Handlers and sources receive a [`SessionHandle`], which can issue requests but not close them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{NotifierError, Result};

#[derive(Debug, Default)]
struct SessionState {
    closed: AtomicUsize,
}

/// Owning side of the HTTP session.
#[derive(Debug)]
pub struct Session {
    client: reqwest::Client,
    state: Arc<SessionState>,
}

/// Read-only view of the session shared with handlers and sources.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    client: reqwest::Client,
    state: Arc<SessionState>,
}

impl Session {
    /// Builds the connection pool. `request_timeout` applies to each request unless overridden.
    pub fn open(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("ow-notifier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifierError::Connection(format!("Failed to build HTTP client: {}", e)))?;
        info!(timeout_secs = request_timeout.as_secs_f64(), "HTTP session opened");
        Ok(Self {
            client,
            state: Arc::new(SessionState::default()),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            client: self.client.clone(),
            state: self.state.clone(),
        }
    }

    /// Releases the session. Consumes `self`, so it runs at most once per session; handles still
    /// alive afterwards refuse to issue requests.
    pub fn close(self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        drop(self.client);
        info!("HTTP session closed");
    }
}

impl SessionHandle {
    /// Returns the client for issuing a request, or a connection error once the session is closed.
    pub fn client(&self) -> Result<&reqwest::Client> {
        if self.is_closed() {
            debug!("request refused: session closed");
            return Err(NotifierError::Connection("HTTP session is closed".to_string()));
        }
        Ok(&self.client)
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    /// How many times the owning [`Session`] was closed (0 or 1).
    pub fn close_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}
