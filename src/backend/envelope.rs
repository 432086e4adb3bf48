use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::telemetry::event::{
    EventRecord, ExceptionRecord, MetricRecord, Properties, TrackedError, UserContext,
};

/// One unit of outbound telemetry, stamped with who and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub time_ms: u64,
    pub instrumentation_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserContext>,
    pub item: TelemetryItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryItem {
    Exception {
        error: TrackedError,
        location: String,
        properties: Properties,
    },
    Event {
        name: String,
        properties: Properties,
        measurements: crate::telemetry::event::Measurements,
    },
    // Defaults are resolved here, never in the facade
    Metric {
        name: String,
        average: f64,
        sample_count: u32,
        min: f64,
        max: f64,
        #[serde(default)]
        properties: Properties,
    },
}

impl From<ExceptionRecord> for TelemetryItem {
    fn from(record: ExceptionRecord) -> Self {
        TelemetryItem::Exception {
            error: record.error,
            location: record.location,
            properties: record.properties,
        }
    }
}

impl From<EventRecord> for TelemetryItem {
    fn from(record: EventRecord) -> Self {
        TelemetryItem::Event {
            name: record.name,
            properties: record.properties,
            measurements: record.measurements,
        }
    }
}

impl From<MetricRecord> for TelemetryItem {
    fn from(record: MetricRecord) -> Self {
        TelemetryItem::Metric {
            sample_count: record.resolved_sample_count(),
            min: record.resolved_min(),
            max: record.resolved_max(),
            name: record.name,
            average: record.average,
            properties: record.properties.unwrap_or_default(),
        }
    }
}

impl Envelope {
    pub fn new(
        instrumentation_key: &str,
        user: Option<UserContext>,
        item: impl Into<TelemetryItem>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            time_ms: now_millis(),
            instrumentation_key: instrumentation_key.to_string(),
            user,
            item: item.into(),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metric_item_resolves_defaults() {
        let item = TelemetryItem::from(MetricRecord::new("render_ms", 12.5));
        assert_eq!(
            item,
            TelemetryItem::Metric {
                name: "render_ms".to_string(),
                average: 12.5,
                sample_count: 1,
                min: 12.5,
                max: 12.5,
                properties: Properties::new(),
            }
        );
    }

    #[test]
    fn envelope_serializes_with_kind_tag() {
        let record = EventRecord {
            name: "snippet.run".to_string(),
            properties: Properties::from([("mode".to_string(), "inline".to_string())]),
            measurements: Default::default(),
        };
        let envelope = Envelope::new("ikey", None, record);
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["instrumentation_key"], json!("ikey"));
        assert_eq!(value["item"]["kind"], json!("event"));
        assert_eq!(value["item"]["properties"], json!({ "mode": "inline" }));
        assert!(value.get("user").is_none());
    }
}
