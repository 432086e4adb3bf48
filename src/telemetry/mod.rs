//! The telemetry facade.
//!
//! # FAIL-OPEN INVARIANT
//! Telemetry is auxiliary. Apart from a backend that cannot be set up at all,
//! no failure inside this module may reach the caller. Every backend call
//! goes through [`guard::guarded`], which reports to the local diagnostic
//! sink and returns.
//!
//! # DISABLE INVARIANT
//! Disabling telemetry is the backend's job. The facade keeps forwarding while
//! disabled and only flips the backend's `disable_telemetry` flag.

pub mod event;
pub mod facade;
pub mod guard;
pub mod state;

use thiserror::Error;

use crate::backend::BackendError;

pub use facade::TelemetryFacade;
pub use state::{Lifecycle, TelemetryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Initialize,
    ToggleTelemetry,
    TrackException,
    TrackEvent,
    TrackMetric,
    SetUserContext,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Initialize => "initialize",
            Operation::ToggleTelemetry => "toggle_telemetry",
            Operation::TrackException => "track_exception",
            Operation::TrackEvent => "track_event",
            Operation::TrackMetric => "track_metric",
            Operation::SetUserContext => "set_authenticated_user_context",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::Initialize => "Could not initialize the telemetry backend.",
            Operation::ToggleTelemetry => "Could not toggle telemetry.",
            Operation::TrackException => {
                "Could not log with the telemetry backend, including exception info below."
            }
            Operation::TrackEvent => {
                "Could not log with the telemetry backend, including tracking info below."
            }
            Operation::TrackMetric => {
                "Could not log with the telemetry backend, including metric info below."
            }
            Operation::SetUserContext => {
                "Could not log with the telemetry backend, including authenticated user context info below."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The backend could not be set up. The only error a caller ever sees.
    #[error("telemetry backend setup failed: {0}")]
    Setup(#[source] BackendError),

    #[error("telemetry backend configuration failed: {0}")]
    Configure(#[source] BackendError),

    #[error("{} failed: {source}", operation.name())]
    Tracking {
        operation: Operation,
        #[source]
        source: BackendError,
    },

    #[error("could not toggle telemetry: {0}")]
    Toggle(#[source] BackendError),
}

impl TelemetryError {
    /// Classifies a failure that the guard swallowed.
    pub fn contained(operation: Operation, source: BackendError) -> Self {
        match operation {
            Operation::Initialize => TelemetryError::Configure(source),
            Operation::ToggleTelemetry => TelemetryError::Toggle(source),
            _ => TelemetryError::Tracking { operation, source },
        }
    }
}
