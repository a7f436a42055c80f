//! shipyard-probe — readiness probing for prepared previews.
//!
//! A preview may only be promoted while its readiness probe is passing.
//! This crate provides the probe primitives and the background monitor
//! that keeps the readiness verdict current:
//!
//! - **`readiness`** — consecutive-result tracker with backoff
//! - **`http`** — raw HTTP probe against a preview endpoint
//! - **`board`** — shared map of latest per-preview verdicts
//! - **`monitor`** — per-preview background probe loops

pub mod board;
pub mod http;
pub mod monitor;
pub mod readiness;

pub use board::ReadinessBoard;
pub use http::http_probe;
pub use monitor::PreviewMonitor;
pub use readiness::{ProbeResult, ReadinessState, ReadinessTracker};
