//! shipyard-traffic — production traffic routing for Shipyard.
//!
//! Maintains the selector that decides which color of an application's
//! blue/green pair receives production traffic. Promote and Rollback flip
//! this selector; previews are never routed to.

pub mod router;

pub use router::{Selector, TrafficRouter};
