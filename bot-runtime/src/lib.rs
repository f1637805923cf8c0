//! # bot-runtime
//!
//! Runs the alert notifier: configuration, event sources (alert poller, Telegram webhook), handlers
//! and the event loop that connects them.

pub mod cli;
pub mod config;
pub mod handlers;
pub mod runner;
pub mod runtime;
pub mod sources;
pub mod state;

pub use cli::Cli;
pub use config::{CliOverrides, Config};
pub use handlers::{AlertNotifier, ChatIdCommand};
pub use runner::{run_bot, shutdown_signal};
pub use runtime::{BotRuntime, EventSink, EventSource, RunSummary};
pub use sources::{AlertPoller, WebhookServer};
pub use state::AlertBoard;
