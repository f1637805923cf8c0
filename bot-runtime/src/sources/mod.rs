//! Event sources: the alert poller and the Telegram webhook server.

mod poller;
mod webhook;

pub use poller::{AlertPoller, POLL_FETCH_TIMEOUT};
pub use webhook::WebhookServer;
