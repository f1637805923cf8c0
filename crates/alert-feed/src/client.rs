//! GraphQL client for the `activeAlerts` query.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use notifier_core::{NotifierError, Result, SessionHandle};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::alert::Alert;
use crate::redact::redacted;

/// Longest prefix of the raw GraphQL response written to the debug log.
const LOGGED_RESPONSE_CHARS: usize = 300;

pub const ACTIVE_ALERTS_QUERY: &str = r#"
{
  activeAlerts {
    pageInfo {
      hasNextPage
    }
    edges {
      node {
        id
        alertId
        alertType
        streamId
        stream {
          labelJSON
        }
        itemPath
        lastItemUnit
        lastItemValueJSON
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GqlResponse {
    data: GqlData,
}

#[derive(Debug, Deserialize)]
struct GqlData {
    #[serde(rename = "activeAlerts")]
    active_alerts: AlertConnection,
}

#[derive(Debug, Deserialize)]
struct AlertConnection {
    #[serde(rename = "pageInfo", default)]
    page_info: Option<PageInfo>,
    edges: Vec<AlertEdge>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage", default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct AlertEdge {
    node: Alert,
}

/// Retrieves active alerts over the shared HTTP session.
#[derive(Clone)]
pub struct AlertClient {
    session: SessionHandle,
    endpoint: String,
    request_timeout: Duration,
}

impl AlertClient {
    pub fn new(session: SessionHandle, endpoint: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            session,
            endpoint: endpoint.into(),
            request_timeout,
        }
    }

    /// Fetches the current active alerts. Duplicate `alertId`s are dropped, first one wins.
    #[instrument(skip(self), fields(endpoint = %redacted(&self.endpoint)))]
    pub async fn retrieve(&self) -> Result<Vec<Alert>> {
        debug!("Retrieving alerts");
        let t0 = Instant::now();

        let resp = self
            .session
            .client()?
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&json!({ "query": ACTIVE_ALERTS_QUERY }))
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;

        let logged: String = body.to_string().chars().take(LOGGED_RESPONSE_CHARS).collect();
        debug!(response = %logged, "GQL response");

        if is_truthy(body.get("error")) || is_truthy(body.get("errors")) {
            return Err(NotifierError::Connection(format!(
                "Received error response from {}: {}",
                redacted(&self.endpoint),
                body
            )));
        }

        let parsed: GqlResponse = serde_json::from_value(body).map_err(|e| {
            NotifierError::Connection(format!(
                "Unexpected response shape from {}: {}",
                redacted(&self.endpoint),
                e
            ))
        })?;
        let connection = parsed.data.active_alerts;
        if connection.page_info.map_or(false, |p| p.has_next_page) {
            warn!("activeAlerts has more pages; only the first page is used");
        }

        let mut seen = HashSet::new();
        let mut alerts = Vec::with_capacity(connection.edges.len());
        for edge in connection.edges {
            if seen.insert(edge.node.alert_id.clone()) {
                alerts.push(edge.node);
            } else {
                warn!(alert_id = %edge.node.alert_id, "Duplicate alertId in response, dropped");
            }
        }

        debug!(
            count = alerts.len(),
            elapsed_secs = t0.elapsed().as_secs_f64(),
            "Retrieved alerts"
        );
        Ok(alerts)
    }
}

/// GraphQL error fields count when present and not null/false/empty.
fn is_truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
    }
}
