//! Trigger guard for automatic (non-user-initiated) requests.
//!
//! Host UIs re-render far more often than the observed subject changes. The guard
//! fires once for the first fingerprint seen while the panel is open and again only
//! when the fingerprint actually changes.

use crate::context::Fingerprint;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct TriggerGuard {
    fired: bool,
    last_fingerprint: Option<Fingerprint>,
}

impl TriggerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether to fire; records the fingerprint when it does.
    pub fn evaluate(&mut self, panel_open: bool, has_credential: bool, fingerprint: &Fingerprint) -> bool {
        if !panel_open || !has_credential {
            return false;
        }
        let changed = self.last_fingerprint.as_ref() != Some(fingerprint);
        if self.fired && !changed {
            debug!(fingerprint = %fingerprint, "trigger suppressed: fingerprint unchanged");
            return false;
        }
        self.fired = true;
        self.last_fingerprint = Some(fingerprint.clone());
        true
    }

    /// Forget everything; the next open-session starts fresh.
    pub fn reset(&mut self) {
        self.fired = false;
        self.last_fingerprint = None;
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn last_fingerprint(&self) -> Option<&Fingerprint> {
        self.last_fingerprint.as_ref()
    }
}
