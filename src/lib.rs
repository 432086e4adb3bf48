pub mod backend;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod global;
pub mod services;
pub mod telemetry;

pub use backend::{Backend, BackendError, RecordingBackend};
pub use config::Config;
pub use diagnostics::{DiagnosticSink, MemorySink, TracingSink};
pub use environment::{Environment, EnvironmentContext};
pub use services::ingest::HttpBackend;
pub use telemetry::event::{MetricRecord, Properties, Measurements, TrackedError};
pub use telemetry::{TelemetryError, TelemetryFacade};
