//! Periodic alert retrieval.

use std::time::Duration;

use alert_feed::AlertClient;
use async_trait::async_trait;
use notifier_core::{EventKind, Result};
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::runtime::{EventSink, EventSource};

/// Upper bound on one retrieval, on top of the per-request timeout.
pub const POLL_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Polls the GraphQL endpoint every `sleep_interval` and emits an `AlertSnapshot` per success.
/// Failed polls are logged and retried after `retry_delay`; they never stop the poller.
pub struct AlertPoller {
    client: AlertClient,
    sleep_interval: Duration,
    retry_delay: Duration,
}

impl AlertPoller {
    pub fn new(client: AlertClient, config: &Config) -> Self {
        Self {
            client,
            sleep_interval: config.sleep_interval,
            retry_delay: config.retry_delay,
        }
    }
}

#[async_trait]
impl EventSource for AlertPoller {
    fn name(&self) -> &str {
        "alert-poller"
    }

    #[instrument(skip_all, fields(source = "alert-poller"))]
    async fn run(self: Box<Self>, sink: EventSink) -> Result<()> {
        loop {
            tokio::select! {
                _ = sink.cancelled() => break,
                _ = tokio::time::sleep(self.sleep_interval) => {}
            }

            let fetched = tokio::select! {
                _ = sink.cancelled() => break,
                fetched = tokio::time::timeout(POLL_FETCH_TIMEOUT, self.client.retrieve()) => fetched,
            };
            let alerts = match fetched {
                Ok(Ok(alerts)) => alerts,
                Ok(Err(e)) => {
                    info!(error = %e, "Failed to retrieve alerts");
                    if !wait_or_cancel(&sink, self.retry_delay).await {
                        break;
                    }
                    continue;
                }
                Err(_) => {
                    info!(timeout_secs = POLL_FETCH_TIMEOUT.as_secs(), "Failed to retrieve alerts: timed out");
                    if !wait_or_cancel(&sink, self.retry_delay).await {
                        break;
                    }
                    continue;
                }
            };

            debug!(count = alerts.len(), "Polled alerts");
            if !sink.emit(EventKind::AlertSnapshot, json!({ "alerts": alerts })).await {
                break;
            }
        }
        info!("Alert poller stopped");
        Ok(())
    }
}

/// Sleeps for `delay`; returns false if shutdown started first.
async fn wait_or_cancel(sink: &EventSink, delay: Duration) -> bool {
    tokio::select! {
        _ = sink.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
