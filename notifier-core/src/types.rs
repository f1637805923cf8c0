//! Core types: event, event kind discriminator, handler response, and Handler trait.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Type discriminator used to route an [`Event`] to its handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A fresh snapshot of the active alerts, produced by the alert poller.
    AlertSnapshot,
    /// An update pushed by Telegram to the webhook endpoint.
    TelegramUpdate,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::AlertSnapshot => f.write_str("alert_snapshot"),
            EventKind::TelegramUpdate => f.write_str("telegram_update"),
        }
    }
}

/// One inbound unit of work. Consumed by exactly one dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    /// Name of the source that produced the event; ordering is guaranteed per source.
    pub source: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind, source: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            source: source.into(),
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Handler result for the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResponse {
    /// Pass to next handler registered for the same kind.
    Continue,
    /// Stop; later handlers for this kind are skipped.
    Stop,
    /// The event was not meant for this handler; try next.
    Ignore,
}

/// Event handler: optional before / handle / after. The table runs all before → handle until Stop →
/// all after (reverse).
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs before the handle phase. Return false to stop dispatch.
    async fn before(&self, _event: &Event) -> crate::error::Result<bool> {
        Ok(true)
    }
    /// Processes the event. Return Stop to end the handle phase. Default: Continue.
    async fn handle(&self, _event: &Event) -> crate::error::Result<HandlerResponse> {
        Ok(HandlerResponse::Continue)
    }
    /// Runs after the handle phase (reverse order), with the final response.
    async fn after(&self, _event: &Event, _response: &HandlerResponse) -> crate::error::Result<()> {
        Ok(())
    }
}
