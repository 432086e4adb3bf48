use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::envelope::{Envelope, TelemetryItem};
use super::metrics::{compute_stats, BackendStats};
use super::{Backend, BackendConfig, BackendError, ErrorHandler, SetupOptions};
use crate::telemetry::event::{EventRecord, ExceptionRecord, MetricRecord, UserContext};

const MAX_ENVELOPES: usize = 10_000;

/// In-memory backend. Keeps the most recent envelopes instead of sending them.
pub struct RecordingBackend {
    inner: Mutex<RecorderState>,
}

struct RecorderState {
    instrumentation_key: Option<String>,
    options: Option<SetupOptions>,
    config: BackendConfig,
    error_handler: Option<ErrorHandler>,
    user: Option<UserContext>,
    buffer: VecDeque<Envelope>,
    dropped: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RecorderState {
                instrumentation_key: None,
                options: None,
                config: BackendConfig::default(),
                error_handler: None,
                user: None,
                buffer: VecDeque::with_capacity(MAX_ENVELOPES),
                dropped: 0,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecorderState>, BackendError> {
        self.inner.lock().map_err(|_| BackendError::Poisoned)
    }

    fn record(&self, item: TelemetryItem) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        let key = state.instrumentation_key.clone().ok_or(BackendError::NotReady)?;

        if state.config.disable_telemetry {
            state.dropped += 1;
            return Ok(());
        }

        let envelope = Envelope::new(&key, state.user.clone(), item);
        if state.config.verbose_logging {
            debug!(id = %envelope.id, "recorded telemetry envelope");
        }

        if state.buffer.len() >= MAX_ENVELOPES {
            state.buffer.pop_front();
        }
        state.buffer.push_back(envelope);
        Ok(())
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.lock()
            .map(|state| state.buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> BackendStats {
        self.lock()
            .map(|state| compute_stats(&state.buffer, state.dropped))
            .unwrap_or_default()
    }

    pub fn setup_options(&self) -> Option<SetupOptions> {
        self.lock().ok().and_then(|state| state.options)
    }

    pub fn user(&self) -> Option<UserContext> {
        self.lock().ok().and_then(|state| state.user.clone())
    }

    /// Feeds a message to the installed error handler, as an internal
    /// failure (a dropped batch, a bad response) would.
    pub fn report_internal_error(&self, message: &str) -> bool {
        let handler = self.lock().ok().and_then(|state| state.error_handler.clone());
        match handler {
            Some(handler) => {
                handler(message);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.lock() {
            state.buffer.clear();
            state.dropped = 0;
        }
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RecordingBackend {
    fn setup(&self, instrumentation_key: &str, options: SetupOptions) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        state.instrumentation_key = Some(instrumentation_key.to_string());
        state.options = Some(options);
        Ok(())
    }

    fn config(&self) -> Result<BackendConfig, BackendError> {
        Ok(self.lock()?.config)
    }

    fn set_enable_debug(&self, enabled: bool) -> Result<(), BackendError> {
        self.lock()?.config.enable_debug = enabled;
        Ok(())
    }

    fn set_verbose_logging(&self, enabled: bool) -> Result<(), BackendError> {
        self.lock()?.config.verbose_logging = enabled;
        Ok(())
    }

    fn set_disable_telemetry(&self, disabled: bool) -> Result<(), BackendError> {
        self.lock()?.config.disable_telemetry = disabled;
        Ok(())
    }

    fn set_error_handler(&self, handler: ErrorHandler) -> Result<(), BackendError> {
        self.lock()?.error_handler = Some(handler);
        Ok(())
    }

    fn track_exception(&self, record: ExceptionRecord) -> Result<(), BackendError> {
        self.record(record.into())
    }

    fn track_event(&self, record: EventRecord) -> Result<(), BackendError> {
        self.record(record.into())
    }

    fn track_metric(&self, record: MetricRecord) -> Result<(), BackendError> {
        self.record(record.into())
    }

    fn set_authenticated_user_context(&self, context: UserContext) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        if state.instrumentation_key.is_none() {
            return Err(BackendError::NotReady);
        }
        state.user = Some(context);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> EventRecord {
        EventRecord {
            name: name.to_string(),
            properties: Default::default(),
            measurements: Default::default(),
        }
    }

    #[test]
    fn rejects_items_before_setup() {
        let backend = RecordingBackend::new();
        assert!(matches!(backend.track_event(event("early")), Err(BackendError::NotReady)));
        assert!(backend.envelopes().is_empty());
    }

    #[test]
    fn drops_items_while_disabled() {
        let backend = RecordingBackend::new();
        backend.setup("ikey", SetupOptions::default()).unwrap();
        backend.set_disable_telemetry(true).unwrap();
        backend.track_event(event("muted")).unwrap();

        backend.set_disable_telemetry(false).unwrap();
        backend.track_event(event("heard")).unwrap();

        let stats = backend.stats();
        assert_eq!(stats.events, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn stamps_user_context_on_later_items() {
        let backend = RecordingBackend::new();
        backend.setup("ikey", SetupOptions::default()).unwrap();
        backend
            .set_authenticated_user_context(UserContext {
                authenticated_user_id: "u42".to_string(),
                account_id: None,
            })
            .unwrap();
        backend.track_event(event("after_login")).unwrap();

        let envelopes = backend.envelopes();
        assert_eq!(envelopes[0].instrumentation_key, "ikey");
        assert_eq!(envelopes[0].user.as_ref().map(|u| u.authenticated_user_id.as_str()), Some("u42"));
    }

    #[test]
    fn buffer_is_bounded() {
        let backend = RecordingBackend::new();
        backend.setup("ikey", SetupOptions::default()).unwrap();
        for i in 0..(MAX_ENVELOPES + 5) {
            backend.track_event(event(&format!("e{}", i))).unwrap();
        }

        let envelopes = backend.envelopes();
        assert_eq!(envelopes.len(), MAX_ENVELOPES);
        match &envelopes[0].item {
            TelemetryItem::Event { name, .. } => assert_eq!(name, "e5"),
            other => panic!("unexpected item {:?}", other),
        }
    }
}
