//! Turns alert snapshots into Telegram notifications.

use std::sync::Arc;
use std::time::Duration;

use alert_feed::{generate_message_texts, Alert, NotifyState};
use async_trait::async_trait;
use notifier_core::{Bot, Event, EventKind, Handler, HandlerError, HandlerResponse, ParseMode, Result};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::state::AlertBoard;

#[derive(Debug, Deserialize)]
struct SnapshotPayload {
    alerts: Vec<Alert>,
}

struct Tracker {
    current: Vec<Alert>,
    notify: NotifyState,
}

/// Handles `AlertSnapshot` events: diffs against the previous snapshot, publishes the new one on the
/// [`AlertBoard`] and sends the resulting texts to the configured chat.
///
/// Bookkeeping is updated before sending, so messages that fail to send are not retried.
pub struct AlertNotifier {
    bot: Arc<dyn Bot>,
    chat_id: Option<String>,
    board: AlertBoard,
    tracker: Mutex<Tracker>,
}

impl AlertNotifier {
    /// `initial` is the snapshot fetched at startup; it is treated as already announced.
    pub fn new(
        bot: Arc<dyn Bot>,
        chat_id: Option<String>,
        board: AlertBoard,
        initial: Vec<Alert>,
        watchdog_delay: Duration,
    ) -> Self {
        Self {
            bot,
            chat_id,
            board,
            tracker: Mutex::new(Tracker {
                current: initial,
                notify: NotifyState::new(watchdog_delay),
            }),
        }
    }
}

#[async_trait]
impl Handler for AlertNotifier {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn handle(&self, event: &Event) -> Result<HandlerResponse> {
        if event.kind != EventKind::AlertSnapshot {
            return Ok(HandlerResponse::Ignore);
        }
        let payload: SnapshotPayload =
            serde_json::from_value(event.payload.clone()).map_err(HandlerError::from)?;
        let now = event.received_at.timestamp();

        let texts = {
            let mut guard = self.tracker.lock().await;
            let tracker = &mut *guard;
            let texts =
                generate_message_texts(&tracker.current, &payload.alerts, &mut tracker.notify, now);
            tracker.current = payload.alerts.clone();
            texts
        };
        self.board.replace(payload.alerts).await;

        if texts.is_empty() {
            debug!("No alert changes");
            return Ok(HandlerResponse::Continue);
        }
        let Some(chat_id) = self.chat_id.as_deref() else {
            info!(messages = texts.len(), "telegram_chat_id not configured");
            return Ok(HandlerResponse::Continue);
        };

        info!(messages = texts.len(), "Sending alert notifications");
        let mut first_error = None;
        for text in &texts {
            if let Err(e) = self
                .bot
                .send_message(chat_id, text, Some(ParseMode::MarkdownV2))
                .await
            {
                debug!(error = %e, "Notification not delivered");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(HandlerError::Failed(format!("failed to send alert notification: {}", e)).into()),
            None => Ok(HandlerResponse::Continue),
        }
    }
}
