use std::collections::VecDeque;
use super::envelope::{Envelope, TelemetryItem};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendStats {
    pub exceptions: u64,
    pub events: u64,
    pub metric_stats: MetricStats,
    /// Items refused while telemetry was disabled.
    pub dropped: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricStats {
    pub count: u64,
    pub total_samples: u64,
    pub avg_of_averages: f64,
    pub max_seen: Option<f64>,
}

impl BackendStats {
    pub fn total(&self) -> u64 {
        self.exceptions + self.events + self.metric_stats.count
    }
}

pub fn compute_stats(envelopes: &VecDeque<Envelope>, dropped: u64) -> BackendStats {
    let mut stats = BackendStats {
        dropped,
        ..Default::default()
    };

    let mut average_sum = 0.0;

    for envelope in envelopes {
        match &envelope.item {
            TelemetryItem::Exception { .. } => stats.exceptions += 1,
            TelemetryItem::Event { .. } => stats.events += 1,
            TelemetryItem::Metric { average, sample_count, max, .. } => {
                stats.metric_stats.count += 1;
                stats.metric_stats.total_samples += u64::from(*sample_count);
                average_sum += average;
                stats.metric_stats.max_seen = Some(match stats.metric_stats.max_seen {
                    Some(seen) if seen >= *max => seen,
                    _ => *max,
                });
            }
        }
    }

    if stats.metric_stats.count > 0 {
        stats.metric_stats.avg_of_averages = average_sum / stats.metric_stats.count as f64;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::event::{EventRecord, MetricRecord};

    #[test]
    fn counts_items_by_kind() {
        let mut buffer = VecDeque::new();
        buffer.push_back(Envelope::new("k", None, EventRecord {
            name: "a".to_string(),
            properties: Default::default(),
            measurements: Default::default(),
        }));
        buffer.push_back(Envelope::new("k", None, MetricRecord::new("m", 10.0).sample_count(3).max(25.0)));
        buffer.push_back(Envelope::new("k", None, MetricRecord::new("m", 20.0)));

        let stats = compute_stats(&buffer, 2);

        assert_eq!(stats.events, 1);
        assert_eq!(stats.exceptions, 0);
        assert_eq!(stats.metric_stats.count, 2);
        assert_eq!(stats.metric_stats.total_samples, 4);
        assert_eq!(stats.metric_stats.avg_of_averages, 15.0);
        assert_eq!(stats.metric_stats.max_seen, Some(25.0));
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.total(), 3);
    }
}
