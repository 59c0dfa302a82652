//! Location settings gate.
//!
//! Validates device settings against the location request. Settings that can
//! be fixed by the user go through the host's resolution prompt, and the
//! prompt's answer becomes the gate's outcome.

use crate::error::DetectorError;
use crate::gate::GateOutcome;
use crate::source::{LocationRequest, SettingsCheck, SettingsPlatform};
use std::sync::Arc;

#[derive(Clone)]
pub struct SettingsGate {
    platform: Arc<dyn SettingsPlatform>,
}

impl SettingsGate {
    pub fn new(platform: Arc<dyn SettingsPlatform>) -> Self {
        Self { platform }
    }

    /// Check the settings for `request`, prompting the user if needed.
    pub async fn check(&self, request: &LocationRequest) -> GateOutcome {
        let check = match self.platform.check_settings(request).await {
            Ok(check) => check,
            Err(_) => return GateOutcome::Cancelled,
        };

        match check {
            SettingsCheck::Satisfied => GateOutcome::Granted,
            SettingsCheck::Unresolvable => {
                GateOutcome::Denied(DetectorError::LocationSettingsRejected)
            }
            SettingsCheck::Resolvable => self.resolve(request).await,
        }
    }

    async fn resolve(&self, request: &LocationRequest) -> GateOutcome {
        let answer = match self.platform.start_resolution(request) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Could not start settings resolution: {}", e);
                return GateOutcome::Denied(DetectorError::LocationSettingsRejected);
            }
        };

        match answer.await {
            Ok(true) => GateOutcome::Granted,
            Ok(false) => GateOutcome::Denied(DetectorError::LocationSettingsRejected),
            Err(_) => GateOutcome::Cancelled,
        }
    }
}
