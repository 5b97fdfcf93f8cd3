//! Paced counter transmission
//!
//! This module provides functionality for:
//! - Formatting the incrementing counter payload
//! - Running the fixed-interval transmission loop against a configured device
//! - Reporting achieved throughput at the end of a run

pub mod message;
pub mod pacer;

pub use pacer::{TransmitStats, Transmitter};

use std::time::Duration;

/// Default pause between messages (100 microseconds, a nominal 10 kHz rate)
pub const DEFAULT_INTERVAL: Duration = Duration::from_micros(100);

/// What to do with the result of each write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Discard write errors and short writes; the loop keeps pacing.
    BestEffort,
    /// End the run on the first write error or short write.
    Strict,
}

/// Configuration for the transmission loop
#[derive(Debug, Clone)]
pub struct TransmitConfig {
    /// Pause between messages (default: 100 µs)
    pub interval: Duration,
    /// Write-result handling (default: best-effort)
    pub policy: WritePolicy,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            policy: WritePolicy::BestEffort,
        }
    }
}

impl TransmitConfig {
    /// Set the pause between messages
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the write-result policy
    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Message rate implied by the configured interval. The achieved rate is
    /// always lower, by the per-iteration formatting and write overhead.
    pub fn nominal_rate_hz(&self) -> f64 {
        1.0 / self.interval.as_secs_f64()
    }
}
