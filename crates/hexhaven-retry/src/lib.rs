//! Ack timeout and retry backoff for Hexhaven snapshot delivery.
//!
//! A snapshot is sent, then the sender waits up to `ack_timeout` for the
//! client's `snapshot_ack`. A missing or negative ack is followed by a
//! backoff pause and a resend, up to `max_retries` resends.
//!
//! ```text
//! send ─ wait ack_timeout ─ backoff(1) ─ send ─ wait ─ backoff(2) ─ send ─ … ─ Failed
//! ```
//!
//! # Integration
//!
//! The schedule sits inside a detached delivery task:
//!
//! ```ignore
//! let mut schedule = RetrySchedule::new(config);
//! loop {
//!     sink.send(payload.clone());
//!     match timeout(schedule.ack_timeout(), ack_rx.recv()).await {
//!         Ok(Some(true)) => break Delivered,
//!         _ if schedule.wait_next().await.is_none() => break Failed,
//!         _ => continue,
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Pause between a failed attempt and the next resend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Same pause before every retry.
    Fixed { delay_ms: u64 },
    /// `initial_ms * factor^(n-1)` before retry `n`, capped at `max_ms`.
    Exponential {
        initial_ms: u64,
        factor: f64,
        max_ms: u64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            initial_ms: 250,
            factor: 2.0,
            max_ms: 4_000,
        }
    }
}

impl Backoff {
    /// Pause before retry number `retry` (1-based), without jitter.
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential {
                initial_ms,
                factor,
                max_ms,
            } => {
                let exp = retry.saturating_sub(1).min(32) as i32;
                let ms = (initial_ms as f64 * factor.powi(exp)).min(max_ms as f64);
                Duration::from_millis(ms as u64)
            }
        }
    }
}

/// Retry policy for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// How long to wait for an ack after each send.
    pub ack_timeout_ms: u64,
    /// Resends after the first attempt. 0 means send once.
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Random extra pause (0..jitter_ms) added to every backoff so clients
    /// that dropped together are not retried in lockstep.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 5_000,
            max_retries: 3,
            backoff: Backoff::default(),
            jitter_ms: 100,
        }
    }
}

impl RetryConfig {
    pub const MIN_ACK_TIMEOUT_MS: u64 = 10;
    pub const MAX_RETRIES: u32 = 10;

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`RetrySchedule::new`]. Rules:
    /// - `ack_timeout_ms` raised to at least [`Self::MIN_ACK_TIMEOUT_MS`].
    /// - `max_retries` capped to [`Self::MAX_RETRIES`].
    /// - Exponential `factor` below 1.0 becomes 1.0; `max_ms` is never
    ///   below `initial_ms`.
    pub fn validated(mut self) -> Self {
        if self.ack_timeout_ms < Self::MIN_ACK_TIMEOUT_MS {
            warn!(
                ack_timeout_ms = self.ack_timeout_ms,
                min = Self::MIN_ACK_TIMEOUT_MS,
                "ack_timeout_ms below minimum, clamping"
            );
            self.ack_timeout_ms = Self::MIN_ACK_TIMEOUT_MS;
        }
        if self.max_retries > Self::MAX_RETRIES {
            warn!(
                max_retries = self.max_retries,
                max = Self::MAX_RETRIES,
                "max_retries exceeds maximum, clamping"
            );
            self.max_retries = Self::MAX_RETRIES;
        }
        if let Backoff::Exponential {
            initial_ms,
            factor,
            max_ms,
        } = self.backoff
        {
            let factor = if factor.is_finite() && factor >= 1.0 {
                factor
            } else {
                1.0
            };
            self.backoff = Backoff::Exponential {
                initial_ms,
                factor,
                max_ms: max_ms.max(initial_ms),
            };
        }
        self
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Total attempts including the first send.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Attempt counter for one delivery. One schedule per delivery task.
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    config: RetryConfig,
    attempts: u32,
}

impl RetrySchedule {
    /// The first attempt is counted immediately: the caller sends once
    /// before ever calling [`wait_next`](Self::wait_next).
    pub fn new(config: RetryConfig) -> Self {
        let config = config.validated();
        trace!(
            ack_timeout_ms = config.ack_timeout_ms,
            max_retries = config.max_retries,
            "retry schedule created"
        );
        Self {
            config,
            attempts: 1,
        }
    }

    /// Attempts made so far, including the first send.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn ack_timeout(&self) -> Duration {
        self.config.ack_timeout()
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.config.max_attempts()
    }

    /// Reserves the next attempt and returns the pause before it, or
    /// `None` once every retry is used.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let retry = self.attempts;
        self.attempts += 1;

        let jitter = if self.config.jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..self.config.jitter_ms))
        } else {
            Duration::ZERO
        };
        Some(self.config.backoff.delay(retry) + jitter)
    }

    /// Sleeps out the backoff before the next attempt. Returns the
    /// attempt number about to be made, or `None` when exhausted.
    pub async fn wait_next(&mut self) -> Option<u32> {
        let delay = self.next_delay()?;
        debug!(
            attempt = self.attempts,
            delay_ms = delay.as_millis() as u64,
            "backing off before retry"
        );
        tokio::time::sleep(delay).await;
        Some(self.attempts)
    }
}
