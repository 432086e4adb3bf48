use insights::backend::Backend;
use insights::environment::EnvironmentContext;
use insights::telemetry::event::{Measurements, MetricRecord, Properties, TrackedError};
use insights::{Config, HttpBackend, RecordingBackend, TelemetryFacade};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;
    let environment = EnvironmentContext::from_env();
    tracing::info!(host = %environment.host, dev_mode = environment.dev_mode, "Insights demo starting...");

    // Without an endpoint everything stays in memory
    let recorder = Arc::new(RecordingBackend::new());
    let backend: Arc<dyn Backend> = match &config.endpoint {
        Some(endpoint) => Arc::new(HttpBackend::new(endpoint.as_str())),
        None => recorder.clone() as Arc<dyn Backend>,
    };

    let telemetry = insights::global::install(TelemetryFacade::new(backend, Arc::new(environment)))
        .map_err(|_| anyhow::anyhow!("telemetry already installed"))?;

    // Tracking before initialize is refused by the backend and only logged
    telemetry.track_event("demo.before_init", None, None);

    telemetry.initialize_with(&config)?;
    telemetry.set_authenticated_user_context("demo-user", Some("demo-account"));

    let started = Instant::now();
    let mut cadence = tokio::time::interval(Duration::from_millis(100));
    for round in 0..5u32 {
        cadence.tick().await;

        let properties = Properties::from([("round".to_string(), round.to_string())]);
        let measurements = Measurements::from([("elapsed_ms".to_string(), started.elapsed().as_millis() as f64)]);
        telemetry.track_event("demo.tick", Some(properties), Some(measurements));
    }

    telemetry.track_metric(
        MetricRecord::new("demo.round_ms", started.elapsed().as_millis() as f64 / 5.0).sample_count(5),
    );

    let failure = TrackedError::new("demo import failed").with_inner(TrackedError::new("gist not found"));
    telemetry.track_exception(&failure, "demo.import");

    telemetry.toggle_telemetry(None);
    tracing::info!(state = ?telemetry.state(), "Telemetry state after toggle");

    if config.endpoint.is_none() {
        tracing::info!(stats = ?recorder.stats(), "Recorded telemetry");
    } else {
        // Let in-flight sends finish before the runtime shuts down
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Ok(())
}
