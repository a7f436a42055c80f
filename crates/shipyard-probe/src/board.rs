//! Shared readiness verdicts.
//!
//! The board holds the latest probe verdict per preview, keyed by
//! `{namespace}/{name}`. The monitor writes it; the blue/green controller
//! reads it as the Promote precondition; the status reporter surfaces it
//! as `preview_ready`. `None` means no preview is being probed (or no
//! probe has concluded yet).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Latest readiness verdict per preview.
#[derive(Clone, Default)]
pub struct ReadinessBoard {
    verdicts: Arc<RwLock<HashMap<String, bool>>>,
}

impl ReadinessBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest verdict for a preview.
    pub fn set(&self, app_key: &str, ready: bool) {
        let mut verdicts = self.verdicts.write().expect("verdicts lock");
        verdicts.insert(app_key.to_string(), ready);
    }

    /// Latest verdict, or `None` if nothing has been recorded.
    pub fn get(&self, app_key: &str) -> Option<bool> {
        let verdicts = self.verdicts.read().expect("verdicts lock");
        verdicts.get(app_key).copied()
    }

    /// Drop the verdict (preview consumed or discarded).
    pub fn clear(&self, app_key: &str) {
        let mut verdicts = self.verdicts.write().expect("verdicts lock");
        verdicts.remove(app_key);
    }
}
