use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::envelope::{Envelope, TelemetryItem};
use crate::backend::{Backend, BackendConfig, BackendError, ErrorHandler, SetupOptions};
use crate::telemetry::event::{EventRecord, ExceptionRecord, MetricRecord, UserContext};

const TIMEOUT_SECS: u64 = 5;

/// Sends each item as one JSON envelope to `{endpoint}/track`.
///
/// Sending is fire-and-forget on the current tokio runtime. Transport
/// failures happen after the call has returned, so they go to the installed
/// error handler rather than back to the facade.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
    inner: Arc<Mutex<HttpState>>,
}

#[derive(Default)]
struct HttpState {
    instrumentation_key: Option<String>,
    options: Option<SetupOptions>,
    config: BackendConfig,
    error_handler: Option<ErrorHandler>,
    user: Option<UserContext>,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            inner: Arc::new(Mutex::new(HttpState::default())),
        }
    }

    pub fn track_url(&self) -> String {
        format!("{}/track", self.endpoint)
    }

    pub fn setup_options(&self) -> Option<SetupOptions> {
        self.lock().ok().and_then(|state| state.options)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HttpState>, BackendError> {
        self.inner.lock().map_err(|_| BackendError::Poisoned)
    }

    fn send(&self, item: TelemetryItem) -> Result<(), BackendError> {
        let (envelope, config, handler) = {
            let state = self.lock()?;
            let key = state.instrumentation_key.as_deref().ok_or(BackendError::NotReady)?;
            if state.config.disable_telemetry {
                return Ok(());
            }
            (
                Envelope::new(key, state.user.clone(), item),
                state.config,
                state.error_handler.clone(),
            )
        };

        let body = serde_json::to_vec(&envelope)?;
        if config.verbose_logging {
            debug!(id = %envelope.id, bytes = body.len(), "sending telemetry envelope");
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BackendError::NoRuntime)?;
        let client = self.client.clone();
        let url = self.track_url();

        runtime.spawn(async move {
            let result = client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await;

            let failure = match result {
                Ok(response) if response.status().is_success() => return,
                Ok(response) => BackendError::Rejected(response.status().to_string()),
                Err(e) => BackendError::Transport(e.to_string()),
            };

            if config.enable_debug {
                warn!(id = %envelope.id, "telemetry send failed: {}", failure);
            }
            if let Some(handler) = handler {
                handler(&failure.to_string());
            }
        });

        Ok(())
    }
}

impl Backend for HttpBackend {
    fn setup(&self, instrumentation_key: &str, options: SetupOptions) -> Result<(), BackendError> {
        if instrumentation_key.trim().is_empty() {
            return Err(BackendError::Rejected("empty instrumentation key".to_string()));
        }
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
        self.send(record.into())
    }

    fn track_event(&self, record: EventRecord) -> Result<(), BackendError> {
        self.send(record.into())
    }

    fn track_metric(&self, record: MetricRecord) -> Result<(), BackendError> {
        self.send(record.into())
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

    fn event() -> EventRecord {
        EventRecord {
            name: "gallery.open".to_string(),
            properties: Default::default(),
            measurements: Default::default(),
        }
    }

    #[test]
    fn trims_trailing_slash() {
        let backend = HttpBackend::new("https://ingest.example.com/");
        assert_eq!(backend.track_url(), "https://ingest.example.com/track");
    }

    #[test]
    fn refuses_before_setup() {
        let backend = HttpBackend::new("http://127.0.0.1:9");
        assert!(matches!(backend.track_event(event()), Err(BackendError::NotReady)));
    }

    #[test]
    fn refuses_empty_key() {
        let backend = HttpBackend::new("http://127.0.0.1:9");
        assert!(matches!(
            backend.setup(" ", SetupOptions::default()),
            Err(BackendError::Rejected(_))
        ));
    }

    #[test]
    fn needs_a_runtime_to_send() {
        let backend = HttpBackend::new("http://127.0.0.1:9");
        backend.setup("ikey", SetupOptions::default()).unwrap();
        assert!(matches!(backend.track_event(event()), Err(BackendError::NoRuntime)));
    }

    #[test]
    fn disabled_backend_sends_nothing() {
        let backend = HttpBackend::new("http://127.0.0.1:9");
        backend.setup("ikey", SetupOptions::default()).unwrap();
        backend.set_disable_telemetry(true).unwrap();
        // No runtime here, so reaching the send path would fail
        assert!(backend.track_event(event()).is_ok());
    }

    #[tokio::test]
    async fn transport_failure_reaches_error_handler() {
        let backend = HttpBackend::new("http://127.0.0.1:9");
        backend.setup("ikey", SetupOptions::default()).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        backend
            .set_error_handler(Arc::new(move |message: &str| {
                let _ = tx.send(message.to_string());
            }))
            .unwrap();

        backend.track_event(event()).unwrap();

        let message = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("handler not called in time")
            .expect("channel closed");
        assert!(!message.is_empty());
    }
}
