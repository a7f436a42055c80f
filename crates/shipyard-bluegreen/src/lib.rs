//! shipyard-bluegreen — the blue/green deployment state machine.
//!
//! Implements the three-phase control flow for zero-downtime releases:
//! Prepare provisions an isolated preview, Promote atomically cuts
//! production traffic over to it, and Rollback restores the immediately
//! preceding stable version. Transitions are serialized per application;
//! concurrent transition requests are rejected, never queued.
//!
//! # Components
//!
//! - **`spec`** — prepare/deploy input validation (DNS-1123 names, ports)
//! - **`machine`** — per-application lifecycle state derivation and guards
//! - **`provision`** — the infrastructure backend seam
//! - **`controller`** — the orchestrator tying registry, traffic, and probes together

pub mod controller;
pub mod error;
pub mod machine;
pub mod provision;
pub mod spec;

pub use controller::{AppStatus, BlueGreenController, PreviewHandle};
pub use error::{BlueGreenError, BlueGreenResult};
pub use machine::{InFlightOp, LifecycleState};
pub use provision::{LocalProvisioner, ProvisionError, Provisioner};
pub use spec::PrepareSpec;
