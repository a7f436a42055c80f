//! Readiness probe bookkeeping.
//!
//! Tracks consecutive probe results for a single preview with
//! configurable thresholds and exponential backoff between probes.

use std::time::Duration;

use tracing::{debug, warn};

/// Result of a single readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The readiness endpoint returned 2xx.
    Ready,
    /// The readiness endpoint returned non-2xx.
    NotReady,
    /// The probe could not be executed (connection error or timeout).
    Failed,
}

/// Aggregate readiness verdict for a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// No probe has concluded yet — Promote must fail fast.
    Unknown,
    /// Probe passing; Promote is legal.
    Ready,
    /// Probe failing past the threshold.
    NotReady,
}

/// Tracks consecutive probe results for a single preview.
#[derive(Debug)]
pub struct ReadinessTracker {
    state: ReadinessState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    /// Failures before flipping to `NotReady`.
    failure_threshold: u32,
    /// Successes before flipping to `Ready`.
    success_threshold: u32,
    current_backoff: Duration,
    base_interval: Duration,
    max_backoff: Duration,
}

impl ReadinessTracker {
    /// Tracker with the default gate: one success makes the preview
    /// promotable, three consecutive failures revoke it.
    pub fn new(interval: Duration) -> Self {
        Self::with_thresholds(3, 1, interval)
    }

    /// Tracker with custom thresholds.
    pub fn with_thresholds(
        failure_threshold: u32,
        success_threshold: u32,
        interval: Duration,
    ) -> Self {
        Self {
            state: ReadinessState::Unknown,
            consecutive_failures: 0,
            consecutive_successes: 0,
            failure_threshold,
            success_threshold,
            current_backoff: interval,
            base_interval: interval,
            max_backoff: Duration::from_secs(60),
        }
    }

    /// Record a probe result and return the new readiness state.
    pub fn record(&mut self, result: ProbeResult) -> ReadinessState {
        match result {
            ProbeResult::Ready => {
                self.consecutive_failures = 0;
                self.consecutive_successes += 1;
                self.current_backoff = self.base_interval;

                if self.consecutive_successes >= self.success_threshold {
                    if self.state != ReadinessState::Ready {
                        debug!(
                            successes = self.consecutive_successes,
                            "preview became ready"
                        );
                    }
                    self.state = ReadinessState::Ready;
                }
            }
            ProbeResult::NotReady | ProbeResult::Failed => {
                self.consecutive_successes = 0;
                self.consecutive_failures += 1;

                // Exponential backoff: double the interval up to max.
                self.current_backoff = (self.current_backoff * 2).min(self.max_backoff);

                if self.consecutive_failures >= self.failure_threshold {
                    if self.state == ReadinessState::Ready {
                        warn!(
                            failures = self.consecutive_failures,
                            threshold = self.failure_threshold,
                            "preview readiness revoked"
                        );
                    }
                    self.state = ReadinessState::NotReady;
                }
            }
        }

        self.state
    }

    /// Current readiness state.
    pub fn state(&self) -> ReadinessState {
        self.state
    }

    /// Current number of consecutive failures.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Current backoff interval before the next probe.
    pub fn next_interval(&self) -> Duration {
        self.current_backoff
    }
}
