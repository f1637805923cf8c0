//! # alert-feed
//!
//! Active-alert feed: retrieves alerts from the GraphQL endpoint ([`AlertClient`]), diffs successive
//! snapshots into notification texts ([`generate_message_texts`]), and renders alerts as Telegram
//! MarkdownV2 ([`alert_text`]).

mod alert;
mod client;
mod diff;
mod format;
mod redact;

pub use alert::{Alert, AlertStream};
pub use client::{AlertClient, ACTIVE_ALERTS_QUERY};
pub use diff::{generate_message_texts, NotifyState, WATCHDOG_ALERT_TYPE};
pub use format::{alert_text, md2_escape};
pub use redact::redacted;
