//! Optional process-wide slot for hosts that want a single shared facade
//! without threading an `Arc` through every call site.

use once_cell::sync::OnceCell;

use crate::telemetry::TelemetryFacade;

static GLOBAL_TELEMETRY: OnceCell<TelemetryFacade> = OnceCell::new();

/// Installs `facade` as the process-wide instance. The slot can be filled
/// once; a second install hands the facade back.
pub fn install(facade: TelemetryFacade) -> Result<&'static TelemetryFacade, TelemetryFacade> {
    GLOBAL_TELEMETRY
        .try_insert(facade)
        .map_err(|(_, rejected)| rejected)
}

pub fn get() -> Option<&'static TelemetryFacade> {
    GLOBAL_TELEMETRY.get()
}
