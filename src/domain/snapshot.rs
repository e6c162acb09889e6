// Dashboard snapshot domain model and wire envelopes
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// The full dashboard state, computed on demand from the store. Never a diff:
/// every push or poll carries the whole thing. Bar/pie entries are running
/// sums per category, not latest values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub line_series: Vec<LinePoint>,
    pub bar_series: Vec<CategoryTotal>,
    pub pie_series: Vec<CategoryTotal>,
    pub total_events: u64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushKind {
    Initial,
    Update,
}

/// Push transport envelope: `{"type": "initial"|"update", "data": ..., "timestamp"?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub data: DashboardSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PushMessage {
    pub fn initial(data: DashboardSnapshot) -> Self {
        Self {
            kind: PushKind::Initial,
            data,
            timestamp: None,
        }
    }

    pub fn update(data: DashboardSnapshot) -> Self {
        Self {
            kind: PushKind::Update,
            data,
            timestamp: Some(Utc::now()),
        }
    }
}

/// Pull transport envelope, also used for the admin error shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DashboardSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PollResponse {
    pub fn ok(data: DashboardSnapshot) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: Some(Utc::now()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            timestamp: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DashboardSnapshot {
        DashboardSnapshot {
            line_series: vec![LinePoint {
                timestamp: Utc::now(),
                value: 1.5,
            }],
            bar_series: vec![CategoryTotal {
                category: "search".to_string(),
                total: 4.0,
            }],
            pie_series: vec![],
            total_events: 2,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("lineSeries").is_some());
        assert!(json.get("barSeries").is_some());
        assert!(json.get("pieSeries").is_some());
        assert_eq!(json["totalEvents"], 2);
        assert!(json.get("lastUpdated").is_some());
    }

    #[test]
    fn test_push_envelope_shape() {
        let initial = serde_json::to_value(PushMessage::initial(sample())).unwrap();
        assert_eq!(initial["type"], "initial");
        assert!(initial.get("timestamp").is_none());

        let update = serde_json::to_value(PushMessage::update(sample())).unwrap();
        assert_eq!(update["type"], "update");
        assert!(update.get("timestamp").is_some());
    }

    #[test]
    fn test_poll_envelope_shape() {
        let ok = serde_json::to_value(PollResponse::ok(sample())).unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(PollResponse::err("boom")).unwrap();
        assert_eq!(err["success"], false);
        assert_eq!(err["error"], "boom");
        assert!(err.get("data").is_none());
    }
}
