use serde::{Deserialize, Serialize};

/// One active alert as returned by the `activeAlerts` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub id: Option<String>,
    pub alert_id: String,
    pub alert_type: String,
    #[serde(default)]
    pub stream_id: Option<String>,
    #[serde(default)]
    pub stream: Option<AlertStream>,
    #[serde(default)]
    pub item_path: Vec<String>,
    #[serde(default)]
    pub last_item_unit: Option<String>,
    #[serde(rename = "lastItemValueJSON", default)]
    pub last_item_value_json: Option<String>,
}

/// The stream an alert belongs to; labels are a JSON object encoded as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStream {
    #[serde(rename = "labelJSON", default)]
    pub label_json: Option<String>,
}
