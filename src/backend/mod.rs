//! Telemetry backends.
//!
//! A backend is the opaque ingestion capability the facade forwards to. It is
//! allowed to fail on any call, and most do before `setup` has run. Whether a
//! disabled backend drops items is the backend's decision; the facade never
//! short-circuits.

pub mod envelope;
pub mod metrics;
pub mod recorder;

use std::sync::Arc;
use thiserror::Error;

use crate::telemetry::event::{EventRecord, ExceptionRecord, MetricRecord, UserContext};

pub use envelope::{Envelope, TelemetryItem};
pub use metrics::BackendStats;
pub use recorder::RecordingBackend;

/// Callback for failures that happen inside the backend, off the call path.
pub type ErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend has not been set up")]
    NotReady,

    #[error("backend rejected the item: {0}")]
    Rejected(String),

    #[error("backend state lock poisoned")]
    Poisoned,

    #[error("no async runtime available to send telemetry")]
    NoRuntime,

    #[error("could not serialize telemetry item: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupOptions {
    pub auto_track_page_visit_time: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            auto_track_page_visit_time: true,
        }
    }
}

/// Mutable configuration flags every backend exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub enable_debug: bool,
    pub verbose_logging: bool,
    pub disable_telemetry: bool,
}

pub trait Backend: Send + Sync {
    fn setup(&self, instrumentation_key: &str, options: SetupOptions) -> Result<(), BackendError>;

    fn config(&self) -> Result<BackendConfig, BackendError>;

    fn set_enable_debug(&self, enabled: bool) -> Result<(), BackendError>;

    fn set_verbose_logging(&self, enabled: bool) -> Result<(), BackendError>;

    fn set_disable_telemetry(&self, disabled: bool) -> Result<(), BackendError>;

    /// Replaces the handler for backend-internal failures.
    fn set_error_handler(&self, handler: ErrorHandler) -> Result<(), BackendError>;

    fn track_exception(&self, record: ExceptionRecord) -> Result<(), BackendError>;

    fn track_event(&self, record: EventRecord) -> Result<(), BackendError>;

    fn track_metric(&self, record: MetricRecord) -> Result<(), BackendError>;

    fn set_authenticated_user_context(&self, context: UserContext) -> Result<(), BackendError>;
}
