//! HTTP server receiving Telegram updates.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use notifier_core::{EventKind, NotifierError, Result};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::runtime::{EventSink, EventSource};
use crate::state::AlertBoard;

pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
struct WebhookState {
    sink: EventSink,
    board: AlertBoard,
    development_mode: bool,
    secret: Option<Arc<str>>,
}

/// Axum server bound before the runtime starts; serves until shutdown.
pub struct WebhookServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    board: AlertBoard,
    development_mode: bool,
    secret: Option<Arc<str>>,
}

impl WebhookServer {
    /// Binds `bind_host:bind_port`. Port 0 picks a free port; see [`WebhookServer::local_addr`].
    pub async fn bind(config: &Config, board: AlertBoard) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| NotifierError::Connection(format!("cannot bind {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "Webhook server listening");
        Ok(Self {
            listener,
            local_addr,
            board,
            development_mode: config.development_mode,
            secret: config.telegram_webhook_secret.as_deref().map(Arc::from),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl EventSource for WebhookServer {
    fn name(&self) -> &str {
        "telegram-webhook"
    }

    #[instrument(skip_all, fields(source = "telegram-webhook"))]
    async fn run(self: Box<Self>, sink: EventSink) -> Result<()> {
        let token = sink.shutdown_token();
        let state = WebhookState {
            sink,
            board: self.board,
            development_mode: self.development_mode,
            secret: self.secret,
        };
        let app = Router::new()
            .route("/", get(handle_index))
            .route("/current-alerts", get(handle_current_alerts))
            .route("/telegram-webhook", post(handle_telegram_webhook))
            .with_state(state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .map_err(|e| NotifierError::Source(format!("webhook server failed: {}", e)))?;
        info!("Webhook server stopped");
        Ok(())
    }
}

async fn handle_index() -> &'static str {
    "Hello from ow-telegram-notifier!\n"
}

async fn handle_current_alerts(State(state): State<WebhookState>) -> Response {
    if !state.development_mode {
        return (StatusCode::FORBIDDEN, "Available only in development mode").into_response();
    }
    let alerts = state.board.snapshot().await;
    Json(json!({ "current_alerts": alerts })).into_response()
}

async fn handle_telegram_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(update): Json<Value>,
) -> Response {
    if let Some(ref expected) = state.secret {
        let given = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        if given != Some(expected.as_ref()) {
            warn!("Rejected webhook call with a missing or wrong secret token");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    debug!(update = %update, "Telegram webhook data");
    if !state.sink.emit(EventKind::TelegramUpdate, update).await {
        return (StatusCode::SERVICE_UNAVAILABLE, "Shutting down").into_response();
    }
    Json(json!({ "ok": true })).into_response()
}
