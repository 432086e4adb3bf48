use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::event::{
    EventRecord, ExceptionRecord, Measurements, MetricRecord, Properties, TrackedError,
    UserContext,
};
use super::guard::{guarded, to_json};
use super::state::TelemetryState;
use super::{Operation, TelemetryError};
use crate::backend::{Backend, ErrorHandler, SetupOptions};
use crate::config::Config;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::environment::Environment;

const INTERNAL_ERROR_MESSAGE: &str = "Telemetry backend reported an internal error.";

/// Best-effort client in front of a telemetry [`Backend`].
///
/// Build one at startup, call [`initialize`](Self::initialize) once, then
/// share it (`Arc`, or [`crate::global`]). Every tracking method returns `()`
/// and never panics on backend failure; failures land in the diagnostic sink
/// together with the call's arguments.
///
/// Tracking before `initialize` is allowed. The backend will usually refuse
/// it, and that refusal is reported like any other failure.
pub struct TelemetryFacade {
    backend: Arc<dyn Backend>,
    environment: Arc<dyn Environment>,
    sink: Arc<dyn DiagnosticSink>,
    state: Mutex<TelemetryState>,
}

impl TelemetryFacade {
    pub fn new(backend: Arc<dyn Backend>, environment: Arc<dyn Environment>) -> Self {
        Self {
            backend,
            environment,
            sink: Arc::new(TracingSink),
            state: Mutex::new(TelemetryState::default()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> TelemetryState {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, TelemetryState> {
        // State is plain flags; a panic mid-update cannot leave it torn
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn sink(&self) -> &dyn DiagnosticSink {
        self.sink.as_ref()
    }

    /// Sets the backend up and configures it for the current environment.
    ///
    /// Only a failing `setup` is returned. Configuration failures after it
    /// are reported to the sink and leave telemetry inert. Call once per
    /// process; a second call re-runs setup.
    pub fn initialize(
        &self,
        instrumentation_key: &str,
        disable_override: Option<bool>,
    ) -> Result<(), TelemetryError> {
        if self.lock_state().initialized() {
            warn!("telemetry already initialized; running backend setup again");
        }

        self.backend
            .setup(
                instrumentation_key,
                SetupOptions {
                    auto_track_page_visit_time: true,
                },
            )
            .map_err(TelemetryError::Setup)?;

        let dev_mode = self.environment.current().dev_mode;
        let disabled = {
            let mut state = self.lock_state();
            state.mark_initialized(disable_override.unwrap_or(false), dev_mode);
            state.telemetry_disabled
        };

        let configured = guarded(
            self.sink(),
            Operation::Initialize,
            || {
                // Backend debug output only outside dev mode
                self.backend.set_enable_debug(!dev_mode)?;
                self.backend.set_verbose_logging(!dev_mode)?;

                let sink = Arc::clone(&self.sink);
                let handler: ErrorHandler = Arc::new(move |message: &str| {
                    sink.log_error(INTERNAL_ERROR_MESSAGE, &json!({ "message": message }));
                });
                self.backend.set_error_handler(handler)
            },
            || json!({ "disable_override": disable_override }),
        );

        if configured {
            info!(dev_mode, disabled, "telemetry initialized");
        }
        Ok(())
    }

    pub fn initialize_with(&self, config: &Config) -> Result<(), TelemetryError> {
        self.initialize(&config.instrumentation_key, Some(config.disable_by_default))
    }

    /// Applies `force || !disabled_at_init` to the backend's disable flag.
    ///
    /// This is not a flip of the live value: with no `force`, repeated calls
    /// keep landing on the same value.
    pub fn toggle_telemetry(&self, force: Option<bool>) {
        let disabled = {
            let mut state = self.lock_state();
            let disabled = state.toggled_value(force.unwrap_or(false));
            state.telemetry_disabled = disabled;
            disabled
        };

        let applied = guarded(
            self.sink(),
            Operation::ToggleTelemetry,
            || self.backend.set_disable_telemetry(disabled),
            || json!({ "force": force }),
        );

        if applied {
            debug!(disabled, "telemetry toggled");
        }
    }

    /// Reports a caught error. The wrapped cause is sent when present; the
    /// outer message, host and build travel as properties.
    pub fn track_exception(&self, error: &TrackedError, location: &str) {
        let environment = self.environment.current();
        if environment.dev_mode {
            self.sink().log_info(&error.message, &to_json(error));
        }

        guarded(
            self.sink(),
            Operation::TrackException,
            || {
                let properties = Properties::from([
                    ("message".to_string(), error.message.clone()),
                    ("host".to_string(), environment.host.clone()),
                    ("build".to_string(), serde_json::to_string(&environment.build)?),
                ]);
                self.backend.track_exception(ExceptionRecord {
                    error: error.reported().clone(),
                    location: location.to_string(),
                    properties,
                })
            },
            || json!({ "error": to_json(error), "location": location }),
        );
    }

    pub fn track_event(
        &self,
        name: &str,
        properties: Option<Properties>,
        measurements: Option<Measurements>,
    ) {
        if self.environment.current().dev_mode {
            self.sink().log_info(name, &Value::Null);
        }

        guarded(
            self.sink(),
            Operation::TrackEvent,
            || {
                self.backend.track_event(EventRecord {
                    name: name.to_string(),
                    properties: properties.clone().unwrap_or_default(),
                    measurements: measurements.clone().unwrap_or_default(),
                })
            },
            || {
                json!({
                    "name": name,
                    "properties": to_json(&properties),
                    "measurements": to_json(&measurements),
                })
            },
        );
    }

    /// Forwards a metric as given; absent sample count, min and max are left
    /// for the backend to default.
    pub fn track_metric(&self, metric: MetricRecord) {
        guarded(
            self.sink(),
            Operation::TrackMetric,
            || self.backend.track_metric(metric.clone()),
            || to_json(&metric),
        );
    }

    /// Ids must not contain `,` `;` `=` `|` or spaces. They are not checked.
    pub fn set_authenticated_user_context(
        &self,
        authenticated_user_id: &str,
        account_id: Option<&str>,
    ) {
        guarded(
            self.sink(),
            Operation::SetUserContext,
            || {
                self.backend.set_authenticated_user_context(UserContext {
                    authenticated_user_id: authenticated_user_id.to_string(),
                    account_id: account_id.map(str::to_string),
                })
            },
            || {
                json!({
                    "authenticated_user_id": authenticated_user_id,
                    "account_id": account_id,
                })
            },
        );
    }
}

impl std::fmt::Debug for TelemetryFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryFacade")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

