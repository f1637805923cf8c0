//! Turning two successive alert snapshots into notification texts.
//!
//! Watchdog alerts flap: a missed heartbeat opens one and the next heartbeat closes it. They are held
//! back until they have been open for the configured delay; one that closes before that is reported
//! once with the recovered marker instead of an open/close pair.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::debug;

use crate::alert::Alert;
use crate::format::alert_text;

/// `alertType` of alerts that are held back before being announced.
pub const WATCHDOG_ALERT_TYPE: &str = "watchdog";

const OPENED: &str = "\u{1F525}";
const CLOSED: &str = "\u{1F334}";
const RECOVERED: &str = "\u{267B}\u{FE0F}";

/// Notification bookkeeping carried between snapshots.
#[derive(Debug, Clone)]
pub struct NotifyState {
    watchdog_delay_secs: i64,
    /// Unannounced watchdog alerts by `alertId`, with the time they were first seen (unix seconds).
    pending: HashMap<String, i64>,
}

impl NotifyState {
    pub fn new(watchdog_delay: Duration) -> Self {
        Self {
            watchdog_delay_secs: i64::try_from(watchdog_delay.as_secs()).unwrap_or(i64::MAX),
            pending: HashMap::new(),
        }
    }

    /// Ids of watchdog alerts seen but not yet announced.
    pub fn pending_alert_ids(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }
}

/// Compares `old_alerts` with `new_alerts` at time `now` (unix seconds) and returns the messages to
/// send: first one listing closed alerts, then one listing opened alerts. Empty lists are omitted.
///
/// Alerts present in `old_alerts` but unknown to `state` count as already announced.
pub fn generate_message_texts(
    old_alerts: &[Alert],
    new_alerts: &[Alert],
    state: &mut NotifyState,
    now: i64,
) -> Vec<String> {
    let old_ids: HashSet<&str> = old_alerts.iter().map(|a| a.alert_id.as_str()).collect();
    let new_ids: HashSet<&str> = new_alerts.iter().map(|a| a.alert_id.as_str()).collect();
    let mut message_texts = Vec::new();

    let mut closed_lines = Vec::new();
    for alert in old_alerts {
        if new_ids.contains(alert.alert_id.as_str()) {
            continue;
        }
        if state.pending.remove(&alert.alert_id).is_some() {
            debug!(alert_id = %alert.alert_id, "Alert recovered before announcement");
            closed_lines.push(format!("{} {}", RECOVERED, alert_text(alert)));
        } else {
            debug!(alert_id = %alert.alert_id, "Alert closed");
            closed_lines.push(format!("{} {}", CLOSED, alert_text(alert)));
        }
    }
    if !closed_lines.is_empty() {
        message_texts.push(closed_lines.join("\n"));
    }

    let mut opened_lines = Vec::new();
    for alert in new_alerts {
        if !old_ids.contains(alert.alert_id.as_str()) {
            if alert.alert_type == WATCHDOG_ALERT_TYPE {
                debug!(alert_id = %alert.alert_id, "Watchdog alert open, holding back");
                state.pending.entry(alert.alert_id.clone()).or_insert(now);
            } else {
                debug!(alert_id = %alert.alert_id, "Alert open");
                opened_lines.push(format!("{} {}", OPENED, alert_text(alert)));
                continue;
            }
        }
        if let Some(&since) = state.pending.get(&alert.alert_id) {
            if now.saturating_sub(since) >= state.watchdog_delay_secs {
                debug!(alert_id = %alert.alert_id, open_secs = now - since, "Watchdog alert open long enough");
                state.pending.remove(&alert.alert_id);
                opened_lines.push(format!("{} {}", OPENED, alert_text(alert)));
            }
        }
    }
    if !opened_lines.is_empty() {
        message_texts.push(opened_lines.join("\n"));
    }

    state.pending.retain(|id, _| new_ids.contains(id.as_str()));
    message_texts
}
