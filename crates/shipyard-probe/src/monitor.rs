//! Preview monitor — background probe loops for prepared previews.
//!
//! The `PreviewMonitor` spawns one background task per prepared preview
//! that periodically probes the readiness endpoint and publishes the
//! verdict on the shared [`ReadinessBoard`]. Prepare starts (or replaces)
//! a loop; Promote, Rollback, and Delete stop it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::board::ReadinessBoard;
use crate::http::http_probe;
use crate::readiness::{ReadinessState, ReadinessTracker};

/// Per-preview monitor state.
struct MonitorSlot {
    /// Handle to the background probe task.
    handle: JoinHandle<()>,
    /// Shutdown signal for this loop.
    shutdown_tx: watch::Sender<bool>,
}

/// Manages readiness probe loops for all prepared previews.
pub struct PreviewMonitor {
    board: ReadinessBoard,
    /// Probe timeout per request.
    timeout: Duration,
    /// Base probe interval.
    interval: Duration,
    /// Active loops: app key → slot.
    monitors: Arc<RwLock<HashMap<String, MonitorSlot>>>,
}

impl PreviewMonitor {
    pub fn new(board: ReadinessBoard, interval: Duration) -> Self {
        Self {
            board,
            timeout: Duration::from_secs(2),
            interval,
            monitors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start probing a preview's readiness endpoint.
    ///
    /// Replaces any loop already running for the same app (a new Prepare
    /// supersedes the old preview).
    pub async fn start(&self, app_key: &str, address: &str, readiness_path: &str) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let key = app_key.to_string();
        let address = address.to_string();
        let path = readiness_path.to_string();
        let board = self.board.clone();
        let timeout = self.timeout;
        let interval = self.interval;

        // A fresh preview has no verdict until a probe concludes.
        board.clear(app_key);

        let handle = tokio::spawn(async move {
            run_probe_loop(&key, &address, &path, board, timeout, interval, shutdown_rx).await;
        });

        let mut monitors = self.monitors.write().await;
        if let Some(old) = monitors.insert(
            app_key.to_string(),
            MonitorSlot {
                handle,
                shutdown_tx,
            },
        ) {
            // Stop the superseded loop.
            let _ = old.shutdown_tx.send(true);
            old.handle.abort();
        }

        info!(app = %app_key, path = %readiness_path, "preview readiness monitor started");
    }

    /// Stop probing a preview (consumed by Promote or discarded).
    pub async fn stop(&self, app_key: &str) {
        let mut monitors = self.monitors.write().await;
        if let Some(slot) = monitors.remove(app_key) {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
            self.board.clear(app_key);
            info!(app = %app_key, "preview readiness monitor stopped");
        }
    }

    /// Stop all loops (graceful shutdown).
    pub async fn stop_all(&self) {
        let mut monitors = self.monitors.write().await;
        for (key, slot) in monitors.drain() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
            debug!(app = %key, "preview readiness monitor stopped");
        }
        info!("all preview monitors stopped");
    }

    /// App keys with an active probe loop.
    pub async fn active(&self) -> Vec<String> {
        let monitors = self.monitors.read().await;
        monitors.keys().cloned().collect()
    }

    /// Whether a preview is currently being probed.
    pub async fn is_probing(&self, app_key: &str) -> bool {
        let monitors = self.monitors.read().await;
        monitors.contains_key(app_key)
    }
}

/// The probe loop for a single preview.
async fn run_probe_loop(
    app_key: &str,
    address: &str,
    path: &str,
    board: ReadinessBoard,
    timeout: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tracker = ReadinessTracker::new(interval);

    debug!(app = %app_key, %address, %path, "readiness loop starting");

    loop {
        let sleep = tracker.next_interval();

        tokio::select! {
            _ = tokio::time::sleep(sleep) => {
                let result = http_probe(address, path, timeout).await;
                let state = tracker.record(result);
                match state {
                    ReadinessState::Ready => board.set(app_key, true),
                    ReadinessState::NotReady => board.set(app_key, false),
                    // Leave the verdict absent until the gate concludes.
                    ReadinessState::Unknown => {}
                }
            }
            _ = shutdown.changed() => {
                debug!(app = %app_key, "readiness loop shutting down");
                break;
            }
        }
    }
}
