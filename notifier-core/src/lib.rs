//! # notifier-core
//!
//! Core types and traits for the notifier: [`Event`], [`Handler`], the shared HTTP [`Session`],
//! the [`Bot`] abstraction with its Telegram implementation, errors and tracing initialization.
//! Transport-agnostic apart from [`TelegramBot`]; used by handler-table and bot-runtime.

pub mod bot;
pub mod error;
pub mod logger;
pub mod session;
pub mod types;

pub use bot::{mask_token, Bot, ParseMode, TelegramBot};
pub use error::{HandlerError, NotifierError, Result};
pub use logger::init_tracing;
pub use session::{Session, SessionHandle};
pub use types::{Event, EventKind, Handler, HandlerResponse};
