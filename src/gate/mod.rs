//! One-shot prerequisites guarding live location updates.
//!
//! The permission gate runs first; the settings gate only starts once the
//! permission gate has reported [`GateOutcome::Granted`]. Whichever gate
//! fails first decides the outcome of the whole pipeline. Nothing is retried.

pub mod permission;
pub mod settings;

use crate::error::DetectorError;
use crate::source::LocationRequest;

pub use permission::PermissionGate;
pub use settings::SettingsGate;

/// Result of one gate activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Granted,
    Denied(DetectorError),
    /// The platform closed the prompt without answering
    Cancelled,
}

impl GateOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GateOutcome::Granted)
    }
}

/// The permission and settings gates, run in order.
pub struct LocationGates {
    permission: PermissionGate,
    settings: SettingsGate,
}

impl LocationGates {
    pub fn new(permission: PermissionGate, settings: SettingsGate) -> Self {
        Self {
            permission,
            settings,
        }
    }

    /// Run both gates for `request`, stopping at the first one that does not
    /// grant.
    pub async fn pass(&self, request: &LocationRequest) -> GateOutcome {
        let outcome = self.permission.check().await;
        tracing::info!("Location permission gate: {:?}", outcome);
        if !outcome.is_granted() {
            return outcome;
        }

        let outcome = self.settings.check(request).await;
        tracing::info!("Location settings gate: {:?}", outcome);
        outcome
    }
}
