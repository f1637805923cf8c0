use std::sync::Arc;

use async_trait::async_trait;
use notifier_core::{Bot, Event, EventKind, Handler, HandlerError, HandlerResponse, Result};
use serde_json::Value;
use tracing::info;

/// Replies to `/id` (or `/id@botname`) with the chat id and the raw chat object, so operators can
/// find the value for `telegram_chat_id`.
pub struct ChatIdCommand {
    bot: Arc<dyn Bot>,
}

impl ChatIdCommand {
    pub fn new(bot: Arc<dyn Bot>) -> Self {
        Self { bot }
    }
}

fn is_id_command(text: &str) -> bool {
    match text.strip_prefix("/id") {
        Some(rest) => rest.is_empty() || rest.starts_with('@'),
        None => false,
    }
}

#[async_trait]
impl Handler for ChatIdCommand {
    async fn handle(&self, event: &Event) -> Result<HandlerResponse> {
        if event.kind != EventKind::TelegramUpdate {
            return Ok(HandlerResponse::Ignore);
        }
        let Some(message) = event.payload.get("message").filter(|m| !m.is_null()) else {
            return Ok(HandlerResponse::Ignore);
        };
        if !message.get("text").and_then(Value::as_str).is_some_and(is_id_command) {
            return Ok(HandlerResponse::Ignore);
        }

        let chat = message
            .get("chat")
            .ok_or_else(|| HandlerError::InvalidPayload("message without chat".to_string()))?;
        let chat_id = match chat.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => return Err(HandlerError::InvalidPayload("chat without id".to_string()).into()),
        };

        info!(chat_id = %chat_id, "Answering /id command");
        let text = format!("Hola, the chat id is {}\nFull data: {}", chat_id, chat);
        self.bot.send_message(&chat_id, &text, None).await?;
        Ok(HandlerResponse::Stop)
    }
}
