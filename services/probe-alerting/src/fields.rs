//! Alert records and their flattened field view

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::endpoint::Endpoint;
use crate::error::AlertingError;

/// Flattened, string-keyed view of an alert used for template substitution
pub type Fields = BTreeMap<String, String>;

/// Prefix for per-label entries in [`Fields`]
pub const TARGET_LABEL_PREFIX: &str = "target.label.";

/// Information about a fired alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertInfo {
    pub name: String,
    pub probe_name: String,
    pub condition_id: String,
    pub target: Endpoint,
    pub failures: u32,
    pub total: u32,
    pub failing_since: DateTime<Utc>,
}

/// Reserved fields plus one `target.label.<name>` entry per target label.
pub fn base_fields(alert: &AlertInfo) -> Fields {
    let mut fields = Fields::from([
        ("alert".to_string(), alert.name.clone()),
        ("probe".to_string(), alert.probe_name.clone()),
        ("target".to_string(), alert.target.dst()),
        ("condition_id".to_string(), alert.condition_id.clone()),
        ("failures".to_string(), alert.failures.to_string()),
        ("total".to_string(), alert.total.to_string()),
        (
            "since".to_string(),
            alert
                .failing_since
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
    ]);

    for (k, v) in &alert.target.labels {
        fields.insert(format!("{}{}", TARGET_LABEL_PREFIX, k), v.clone());
    }

    fields
}

/// [`base_fields`] plus a `json` entry holding the JSON encoding of them.
pub fn alert_fields(alert: &AlertInfo) -> crate::Result<Fields> {
    let mut fields = base_fields(alert);
    let json =
        serde_json::to_string(&fields).map_err(|e| AlertingError::Encoding(e.to_string()))?;
    fields.insert("json".to_string(), json);
    Ok(fields)
}
