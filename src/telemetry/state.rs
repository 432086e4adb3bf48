/// `New` until `initialize` has set the backend up; `Ready` afterwards.
/// There is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    New,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryState {
    pub lifecycle: Lifecycle,
    /// Last value applied (or attempted) on the backend's disable flag.
    pub telemetry_disabled: bool,
    /// `disable_override || dev_mode`, captured once by `initialize`.
    /// `toggle_telemetry` derives from this, not from the live flag.
    pub disabled_at_init: bool,
    pub dev_mode_at_init: bool,
}

impl TelemetryState {
    pub fn initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    pub(crate) fn mark_initialized(&mut self, disable_override: bool, dev_mode: bool) {
        let disabled = disable_override || dev_mode;
        self.lifecycle = Lifecycle::Ready;
        self.disabled_at_init = disabled;
        self.telemetry_disabled = disabled;
        self.dev_mode_at_init = dev_mode;
    }

    pub(crate) fn toggled_value(&self, force: bool) -> bool {
        force || !self.disabled_at_init
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized_and_enabled() {
        let state = TelemetryState::default();
        assert!(!state.initialized());
        assert!(!state.telemetry_disabled);
    }

    #[test]
    fn dev_mode_disables_at_init() {
        let mut state = TelemetryState::default();
        state.mark_initialized(false, true);
        assert!(state.initialized());
        assert!(state.telemetry_disabled);
        assert!(state.disabled_at_init);
    }

    #[test]
    fn toggle_ignores_live_flag() {
        let mut state = TelemetryState::default();
        state.mark_initialized(false, false);

        state.telemetry_disabled = state.toggled_value(false);
        assert!(state.telemetry_disabled);
        // A second toggle lands on the same value rather than flipping back
        state.telemetry_disabled = state.toggled_value(false);
        assert!(state.telemetry_disabled);
        assert!(state.toggled_value(true));
    }
}
