//! Per-application lifecycle states and transition guards.
//!
//! The lifecycle state is derived, not stored: it is a function of the
//! registry record (`preview`, `previous_stable`), the latest readiness
//! verdict, and whatever transition is in flight. Deriving instead of
//! persisting keeps the registry record free of states that could go
//! stale across a restart (readiness resets to unknown and is re-probed).

use serde::{Deserialize, Serialize};

use shipyard_state::AppRecord;

/// A transition currently holding an application's serialization guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlightOp {
    /// Prepare is provisioning a preview.
    Preparing,
    /// Promote is cutting traffic over.
    Promoting,
    /// Rollback is restoring the previous stable.
    RollingBack,
    /// Deploy, scale, or delete is mutating the stable descriptor.
    Updating,
}

impl InFlightOp {
    pub fn as_str(self) -> &'static str {
        match self {
            InFlightOp::Preparing => "prepare",
            InFlightOp::Promoting => "promote",
            InFlightOp::RollingBack => "rollback",
            InFlightOp::Updating => "update",
        }
    }
}

/// Lifecycle state of one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No preview exists.
    NoPreview,
    /// Prepare issued; readiness probe has not passed.
    PreviewPending,
    /// Readiness probe passing; Promote is legal.
    PreviewReady,
    /// Promote in flight.
    Promoting,
    /// Post-promote; `previous_stable` set, Rollback is legal.
    RollbackEligible,
    /// Rollback in flight.
    RollingBack,
}

/// Derive the lifecycle state of an application.
///
/// `preview_ready` is the latest probe verdict (`None` while unknown);
/// `in_flight` is the transition currently holding the app's guard.
pub fn derive_state(
    record: &AppRecord,
    preview_ready: Option<bool>,
    in_flight: Option<InFlightOp>,
) -> LifecycleState {
    match in_flight {
        Some(InFlightOp::Promoting) => return LifecycleState::Promoting,
        Some(InFlightOp::RollingBack) => return LifecycleState::RollingBack,
        Some(InFlightOp::Preparing) => return LifecycleState::PreviewPending,
        Some(InFlightOp::Updating) | None => {}
    }

    if record.preview.is_some() {
        if preview_ready == Some(true) {
            LifecycleState::PreviewReady
        } else {
            LifecycleState::PreviewPending
        }
    } else if record.previous_stable.is_some() {
        LifecycleState::RollbackEligible
    } else {
        LifecycleState::NoPreview
    }
}
