use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Tracks whether the SFU facade has completed initialization, for the
/// `/healthz` route. Cheap to clone and share with the warp filter.
#[derive(Clone, Default)]
pub struct HealthState {
    ready: Arc<AtomicBool>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_state_starts_not_ready() {
        let state = HealthState::new();
        assert!(!state.is_ready());
    }

    #[test]
    fn test_health_state_mark_ready() {
        let state = HealthState::new();
        state.mark_ready();
        assert!(state.is_ready());
    }
}
