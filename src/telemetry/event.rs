use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Filterable string dimensions attached to an item.
pub type Properties = BTreeMap<String, String>;

/// Numeric values attached to an event.
pub type Measurements = BTreeMap<String, f64>;

/// An error as the facade sees it: a message plus an optional wrapped cause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_error: Option<Box<TrackedError>>,
}

impl TrackedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            inner_error: None,
        }
    }

    pub fn with_inner(mut self, inner: TrackedError) -> Self {
        self.inner_error = Some(Box::new(inner));
        self
    }

    /// The error that gets reported: the wrapped cause when there is one.
    pub fn reported(&self) -> &TrackedError {
        self.inner_error.as_deref().unwrap_or(self)
    }

    /// Builds the chain from an `Error` and its `source()` links.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            message: err.to_string(),
            inner_error: err.source().map(|s| Box::new(Self::from_error(s))),
        }
    }
}

impl From<anyhow::Error> for TrackedError {
    fn from(err: anyhow::Error) -> Self {
        let mut chain = err.chain().rev();
        // chain() always yields at least the outermost error
        let root = chain
            .next()
            .map(|e| TrackedError::new(e.to_string()))
            .unwrap_or_else(|| TrackedError::new(err.to_string()));
        chain.fold(root, |inner, e| TrackedError::new(e.to_string()).with_inner(inner))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub measurements: Measurements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    /// Already unwrapped to the reported cause.
    pub error: TrackedError,
    pub location: String,
    pub properties: Properties,
}

/// A pre-aggregated metric sample.
///
/// Absent fields are forwarded as absent; backends resolve them with
/// [`MetricRecord::resolved_sample_count`] and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    pub average: f64,
    pub sample_count: Option<u32>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub properties: Option<Properties>,
}

impl MetricRecord {
    pub fn new(name: impl Into<String>, average: f64) -> Self {
        Self {
            name: name.into(),
            average,
            sample_count: None,
            min: None,
            max: None,
            properties: None,
        }
    }

    pub fn sample_count(mut self, count: u32) -> Self {
        self.sample_count = Some(count);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn resolved_sample_count(&self) -> u32 {
        self.sample_count.unwrap_or(1)
    }

    pub fn resolved_min(&self) -> f64 {
        self.min.unwrap_or(self.average)
    }

    pub fn resolved_max(&self) -> f64 {
        self.max.unwrap_or(self.average)
    }
}

/// Authenticated identity for the current session.
///
/// Ids must not contain `,` `;` `=` `|` or spaces. Not validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub authenticated_user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("import failed")]
    struct ImportError(#[source] std::io::Error);

    #[test]
    fn reported_prefers_inner_error() {
        let err = TrackedError::new("boom").with_inner(TrackedError::new("root cause"));
        assert_eq!(err.reported().message, "root cause");

        let bare = TrackedError::new("boom");
        assert_eq!(bare.reported().message, "boom");
    }

    #[test]
    fn from_error_follows_source_chain() {
        let err = ImportError(std::io::Error::new(std::io::ErrorKind::NotFound, "gist missing"));
        let tracked = TrackedError::from_error(&err);

        assert_eq!(tracked.message, "import failed");
        assert_eq!(tracked.reported().message, "gist missing");
    }

    #[test]
    fn from_anyhow_keeps_context_as_outer() {
        let err = anyhow::anyhow!("socket closed").context("sync failed");
        let tracked = TrackedError::from(err);

        assert_eq!(tracked.message, "sync failed");
        assert_eq!(tracked.reported().message, "socket closed");
    }

    #[test]
    fn metric_defaults_resolve_to_average() {
        let metric = MetricRecord::new("load_ms", 42.0);
        assert_eq!(metric.resolved_sample_count(), 1);
        assert_eq!(metric.resolved_min(), 42.0);
        assert_eq!(metric.resolved_max(), 42.0);

        let metric = metric.sample_count(4).min(10.0).max(90.0);
        assert_eq!(metric.resolved_sample_count(), 4);
        assert_eq!(metric.resolved_min(), 10.0);
        assert_eq!(metric.resolved_max(), 90.0);
    }
}
