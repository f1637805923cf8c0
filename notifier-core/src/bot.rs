//! Bot abstraction for sending messages and registering the webhook.
//!
//! [`Bot`] trait is transport-agnostic; [`TelegramBot`] implements it over the Bot HTTP API using the
//! shared [`SessionHandle`].

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{NotifierError, Result};
use crate::session::SessionHandle;

/// Longest response body prefix written to the debug log.
const LOGGED_BODY_CHARS: usize = 1000;

/// Text formatting mode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    MarkdownV2,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

/// Abstraction for outbound bot actions. Implementations map to a transport (e.g. Telegram).
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a text message to the given chat. `chat_id` is numeric or `@channelname`.
    async fn send_message(&self, chat_id: &str, text: &str, parse_mode: Option<ParseMode>) -> Result<()>;
    /// Points the platform's update delivery at `url`.
    async fn set_webhook(
        &self,
        url: &str,
        allowed_updates: &[&str],
        secret_token: Option<&str>,
    ) -> Result<()>;
}

/// Masks a token for logging: first 7 chars + `***` + last 4 chars; short tokens become `***`.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_ascii() {
        "***".to_string()
    } else {
        format!("{}***{}", &token[..7], &token[len - 4..])
    }
}

/// Telegram Bot API implementation of [`Bot`].
#[derive(Clone)]
pub struct TelegramBot {
    session: SessionHandle,
    api_url: String,
    token: String,
}

impl TelegramBot {
    /// Creates a bot calling `{api_url}/bot{token}/{method}` through the shared session.
    pub fn new(session: SessionHandle, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            session,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Calls a Bot API method and returns its `result` field.
    pub async fn call(&self, method: &str, params: &Value) -> Result<Value> {
        let url = format!("{}/bot{}/{}", self.api_url, self.token, method);
        info!(method = %method, params = %params, "Calling Telegram API method");

        let resp = self.session.client()?.post(&url).json(params).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        let logged: String = text.chars().take(LOGGED_BODY_CHARS).collect();
        debug!(method = %method, status = status.as_u16(), body = %logged, "Telegram API response");

        let body: Option<Value> = serde_json::from_str(&text).ok();
        let description = body
            .as_ref()
            .and_then(|b| b.get("description"))
            .and_then(Value::as_str)
            .unwrap_or("no description")
            .to_string();

        if status.is_server_error() {
            return Err(NotifierError::Connection(format!(
                "Telegram {} failed with {}: {}",
                method, status, description
            )));
        }
        if !status.is_success() {
            return Err(NotifierError::Bot(format!(
                "Telegram {} failed with {}: {}",
                method, status, description
            )));
        }

        let body = body.ok_or_else(|| {
            NotifierError::Bot(format!("Telegram {} returned a non-JSON body", method))
        })?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            return Err(NotifierError::Bot(format!(
                "Telegram {} not ok: {}",
                method, description
            )));
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

/// Numeric chat ids go out as JSON numbers, channel usernames as strings.
fn chat_id_value(chat_id: &str) -> Value {
    match chat_id.parse::<i64>() {
        Ok(id) => json!(id),
        Err(_) => json!(chat_id),
    }
}

#[async_trait]
impl Bot for TelegramBot {
    async fn send_message(&self, chat_id: &str, text: &str, parse_mode: Option<ParseMode>) -> Result<()> {
        let mut params = json!({
            "chat_id": chat_id_value(chat_id),
            "text": text,
        });
        if let Some(mode) = parse_mode {
            params["parse_mode"] = json!(mode.as_str());
        }
        self.call("sendMessage", &params).await?;
        Ok(())
    }

    async fn set_webhook(
        &self,
        url: &str,
        allowed_updates: &[&str],
        secret_token: Option<&str>,
    ) -> Result<()> {
        let mut params = json!({
            "url": url,
            "allowed_updates": allowed_updates,
        });
        if let Some(secret) = secret_token {
            params["secret_token"] = json!(secret);
        }
        self.call("setWebhook", &params).await?;
        Ok(())
    }
}
