//! Telegram MarkdownV2 rendering of alerts.

use serde_json::{Map, Value};
use tracing::error;

use crate::alert::Alert;

/// Characters that must be backslash-escaped in MarkdownV2 text
/// (<https://core.telegram.org/bots/api#markdownv2-style>).
const MD2_SPECIAL: &str = "_*[]()~`>#+-=|{}.!";

/// Escapes every MarkdownV2 special character with a backslash.
pub fn md2_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if MD2_SPECIAL.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders one alert line:
/// `label\=`value` ... *type* item>path value \(`alertId`\)`.
///
/// When the alert cannot be rendered (no stream labels, labels not a JSON object) the error is logged
/// and the alert's JSON is returned instead.
pub fn alert_text(alert: &Alert) -> String {
    match try_alert_text(alert) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, alert_id = %alert.alert_id, "Failed to build alert text");
            serde_json::to_string(alert).unwrap_or_else(|_| alert.alert_id.clone())
        }
    }
}

fn try_alert_text(alert: &Alert) -> Result<String, String> {
    let esc = md2_escape;
    let label_json = alert
        .stream
        .as_ref()
        .and_then(|s| s.label_json.as_deref())
        .ok_or_else(|| "alert has no stream labelJSON".to_string())?;
    let labels: Map<String, Value> =
        serde_json::from_str(label_json).map_err(|e| format!("invalid labelJSON: {}", e))?;

    let label_str = labels
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}{}`{}`", esc(k), esc("="), esc(&v))
        })
        .collect::<Vec<_>>()
        .join(" ");
    let path = alert.item_path.join(">");
    let value = alert.last_item_value_json.as_deref().unwrap_or("-");

    Ok(format!(
        "{} *{}* {} {} {}`{}`{}",
        label_str,
        esc(&alert.alert_type),
        esc(&path),
        esc(value),
        esc("("),
        esc(&alert.alert_id),
        esc(")"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertStream;

    fn watchdog_alert() -> Alert {
        Alert {
            id: Some("QWxlcnQ6aHJlMnBiMGY=".to_string()),
            alert_id: "hre2pb0f".to_string(),
            alert_type: "watchdog".to_string(),
            stream_id: Some("3scxxinu".to_string()),
            stream: Some(AlertStream {
                label_json: Some(r#"{"agent":"system","host":"example.com"}"#.to_string()),
            }),
            item_path: vec!["watchdog".to_string()],
            last_item_unit: None,
            last_item_value_json: None,
        }
    }

    #[test]
    fn test_md2_escape_escapes_all_special_chars() {
        assert_eq!(md2_escape("a.b-c"), r"a\.b\-c");
        assert_eq!(md2_escape("(x)!"), r"\(x\)\!");
        assert_eq!(md2_escape("plain"), "plain");
    }

    #[test]
    fn test_alert_text_watchdog() {
        assert_eq!(
            alert_text(&watchdog_alert()),
            r"agent\=`system` host\=`example\.com` *watchdog* watchdog \- \(`hre2pb0f`\)"
        );
    }

    #[test]
    fn test_alert_text_keeps_label_order_and_joins_path() {
        let mut alert = watchdog_alert();
        alert.stream = Some(AlertStream {
            label_json: Some(r#"{"host":"db1","agent":"disk","mount":"/var"}"#.to_string()),
        });
        alert.alert_type = "threshold".to_string();
        alert.item_path = vec!["volumes".to_string(), "/var".to_string(), "usage".to_string()];
        alert.last_item_value_json = Some("97.5".to_string());

        assert_eq!(
            alert_text(&alert),
            r"host\=`db1` agent\=`disk` mount\=`/var` *threshold* volumes\>/var\>usage 97\.5 \(`hre2pb0f`\)"
        );
    }

    #[test]
    fn test_alert_text_falls_back_to_json() {
        let mut alert = watchdog_alert();
        alert.stream = None;
        let text = alert_text(&alert);
        assert!(text.starts_with('{'));
        assert!(text.contains(r#""alertId":"hre2pb0f""#));
    }
}
