//! Startup sequence: session, initial snapshot, webhook server and registration, then the runtime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alert_feed::AlertClient;
use handler_table::HandlerTable;
use notifier_core::{Bot, EventKind, NotifierError, Result, Session, TelegramBot};
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::handlers::{AlertNotifier, ChatIdCommand};
use crate::runtime::{BotRuntime, RunSummary};
use crate::sources::{AlertPoller, WebhookServer};
use crate::state::AlertBoard;

/// Bound on the alert fetch done before anything else starts.
pub const INITIAL_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Update types requested from Telegram when registering the webhook.
pub const ALLOWED_UPDATES: &[&str] = &["message"];

/// Runs the notifier until `shutdown` completes or a source fails.
///
/// Failures during setup (session, initial fetch, bind, webhook registration) are returned without
/// starting the runtime; the session is closed on every path.
#[instrument(skip_all)]
pub async fn run_bot<F>(config: Config, shutdown: F) -> Result<RunSummary>
where
    F: Future<Output = ()>,
{
    let config = Arc::new(config);
    let session = Session::open(config.request_timeout)?;

    let (table, poller, webhook) = match build_runtime(&config, &session).await {
        Ok(parts) => parts,
        Err(e) => {
            session.close();
            return Err(e);
        }
    };

    BotRuntime::new(config, session, table)
        .add_source(Box::new(poller))
        .add_source(Box::new(webhook))
        .run(shutdown)
        .await
}

async fn build_runtime(
    config: &Config,
    session: &Session,
) -> Result<(HandlerTable, AlertPoller, WebhookServer)> {
    let client = AlertClient::new(
        session.handle(),
        config.graphql_endpoint.clone(),
        config.request_timeout,
    );
    let initial = tokio::time::timeout(INITIAL_FETCH_TIMEOUT, client.retrieve())
        .await
        .map_err(|_| {
            NotifierError::Connection(format!(
                "initial alert retrieval timed out after {}s",
                INITIAL_FETCH_TIMEOUT.as_secs()
            ))
        })??;
    info!(count = initial.len(), "Initial alerts retrieved");
    for alert in &initial {
        debug!(alert = ?alert, "Initial alert");
    }

    let board = AlertBoard::new(initial.clone());
    let webhook = WebhookServer::bind(config, board.clone()).await?;

    let bot: Arc<dyn Bot> = Arc::new(TelegramBot::new(
        session.handle(),
        config.telegram_api_url.clone(),
        config.telegram_api_token.clone(),
    ));
    match config.webhook_url() {
        Some(url) => {
            bot.set_webhook(&url, ALLOWED_UPDATES, config.telegram_webhook_secret.as_deref())
                .await?;
            info!(url = %url, "Telegram webhook registered");
        }
        None => info!("public_url not configured, Telegram webhook not registered"),
    }

    let table = HandlerTable::new()
        .on(
            EventKind::AlertSnapshot,
            Arc::new(AlertNotifier::new(
                bot.clone(),
                config.telegram_chat_id.clone(),
                board,
                initial,
                config.watchdog_delay,
            )),
        )
        .on(EventKind::TelegramUpdate, Arc::new(ChatIdCommand::new(bot)));

    Ok((table, AlertPoller::new(client, config), webhook))
}

/// Completes on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
