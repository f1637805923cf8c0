use std::sync::Arc;

use alert_feed::Alert;
use tokio::sync::RwLock;

/// Latest alert snapshot, written by the alert notifier and read by the webhook server.
#[derive(Clone, Default)]
pub struct AlertBoard {
    alerts: Arc<RwLock<Vec<Alert>>>,
}

impl AlertBoard {
    pub fn new(initial: Vec<Alert>) -> Self {
        Self {
            alerts: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn snapshot(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }

    pub async fn replace(&self, alerts: Vec<Alert>) {
        *self.alerts.write().await = alerts;
    }
}
