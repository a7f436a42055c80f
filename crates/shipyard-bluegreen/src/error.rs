//! Error taxonomy for blue/green operations.
//!
//! Handlers never swallow errors, and every failure path leaves the
//! registry unchanged: a failed Promote must not have touched
//! `stable`/`previous_stable`.

use thiserror::Error;

/// Result type alias for blue/green operations.
pub type BlueGreenResult<T> = Result<T, BlueGreenError>;

/// Errors returned by the blue/green controller.
#[derive(Debug, Error)]
pub enum BlueGreenError {
    /// Malformed input; never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Concurrent or out-of-state-order request; retry after backoff.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No such application, preview, or rollback target.
    #[error("not found: {0}")]
    NotFound(String),

    /// Promote attempted while readiness is unknown or failing.
    #[error("not ready: {0}")]
    NotReady(String),

    /// Infrastructure failure, surfaced verbatim; not retried here.
    #[error("provisioning failed: {0}")]
    Provision(String),

    /// Registry storage failure.
    #[error(transparent)]
    Registry(#[from] shipyard_state::RegistryError),
}
