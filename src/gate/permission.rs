//! Location permission gate.

use crate::error::DetectorError;
use crate::gate::GateOutcome;
use crate::source::{LocationPermission, PermissionGrants, PermissionPlatform};
use std::sync::Arc;

/// Requests coarse and fine location together in one platform call.
#[derive(Clone)]
pub struct PermissionGate {
    platform: Arc<dyn PermissionPlatform>,
}

impl PermissionGate {
    pub fn new(platform: Arc<dyn PermissionPlatform>) -> Self {
        Self { platform }
    }

    /// Ask for both permissions and wait for the answer.
    pub async fn check(&self) -> GateOutcome {
        let answer = self
            .platform
            .request_permissions(&[LocationPermission::Fine, LocationPermission::Coarse]);

        match answer.await {
            Ok(grants) => outcome_for(grants),
            Err(_) => GateOutcome::Cancelled,
        }
    }
}

/// Both granted passes; coarse alone means fine was refused; anything else is
/// a plain refusal.
fn outcome_for(grants: PermissionGrants) -> GateOutcome {
    match (grants.coarse, grants.fine) {
        (true, true) => GateOutcome::Granted,
        (true, false) => GateOutcome::Denied(DetectorError::FineLocationDenied),
        _ => GateOutcome::Denied(DetectorError::LocationPermissionDenied),
    }
}
