//! Mock implementation of [`notifier_core::Bot`] for handler tests.
//!
//! Records every `send_message` so tests can assert on chat id, text and parse mode without hitting
//! Telegram. Can be told to fail every send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use notifier_core::{Bot, NotifierError, ParseMode, Result};
use tokio::sync::mpsc;

/// One recorded call to `send_message(chat_id, text, parse_mode)`.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
}

pub struct MockBot {
    sent_tx: mpsc::UnboundedSender<SentMessage>,
    fail_sends: AtomicBool,
}

impl MockBot {
    /// Creates a MockBot and returns the receiver for sent messages.
    pub fn with_receiver() -> (Arc<Self>, mpsc::UnboundedReceiver<SentMessage>) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let bot = Arc::new(Self {
            sent_tx,
            fail_sends: AtomicBool::new(false),
        });
        (bot, sent_rx)
    }

    /// Makes every following `send_message` record the call and then fail.
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send_message(&self, chat_id: &str, text: &str, parse_mode: Option<ParseMode>) -> Result<()> {
        let _ = self.sent_tx.send(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            parse_mode,
        });
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(NotifierError::Bot("Bad Request: chat not found".to_string()));
        }
        Ok(())
    }

    async fn set_webhook(
        &self,
        _url: &str,
        _allowed_updates: &[&str],
        _secret_token: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Drains everything sent so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<SentMessage>) -> Vec<SentMessage> {
    let mut sent = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        sent.push(msg);
    }
    sent
}
