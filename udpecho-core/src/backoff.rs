//! Exponential backoff: the wait schedule between retry attempts.

use std::time::Duration;

/// Default initial wait in milliseconds.
pub const DEFAULT_BASE_MS: u64 = 500;
/// Default growth factor applied after each failed attempt.
pub const DEFAULT_MULTIPLIER: u32 = 2;
/// Default maximum wait in milliseconds.
pub const DEFAULT_CAP_MS: u64 = 8000;

/// Validated backoff parameters. The current interval starts at `base`, is
/// used as the bound for one attempt, and grows via [`BackoffSchedule::grow`]
/// only after that attempt fails. Read-only for the lifetime of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffSchedule {
    base: Duration,
    multiplier: u32,
    cap: Duration,
}

/// Schedule parameters that violate `base > 0`, `multiplier > 1` or
/// `cap >= base`. Rejected at construction, before any network activity.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSchedule {
    #[error("backoff base must be greater than zero")]
    ZeroBase,
    #[error("backoff multiplier must be greater than one, got {0}")]
    MultiplierTooSmall(u32),
    #[error("backoff cap {cap:?} is below base {base:?}")]
    CapBelowBase { base: Duration, cap: Duration },
}

impl BackoffSchedule {
    pub fn new(
        base: Duration,
        multiplier: u32,
        cap: Duration,
    ) -> Result<Self, InvalidSchedule> {
        if base.is_zero() {
            return Err(InvalidSchedule::ZeroBase);
        }
        if multiplier <= 1 {
            return Err(InvalidSchedule::MultiplierTooSmall(multiplier));
        }
        if cap < base {
            return Err(InvalidSchedule::CapBelowBase { base, cap });
        }
        Ok(Self {
            base,
            multiplier,
            cap,
        })
    }

    /// Convenience constructor from millisecond values, as carried by
    /// configuration.
    pub fn from_millis(
        base_ms: u64,
        multiplier: u32,
        cap_ms: u64,
    ) -> Result<Self, InvalidSchedule> {
        Self::new(
            Duration::from_millis(base_ms),
            multiplier,
            Duration::from_millis(cap_ms),
        )
    }

    /// First wait interval.
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Upper bound on any wait interval.
    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Next wait after a failed attempt: multiply, then clamp to the cap.
    pub fn grow(&self, current: Duration) -> Duration {
        (current * self.multiplier).min(self.cap)
    }
}

impl Default for BackoffSchedule {
    /// The reference schedule: 500 ms base, doubling, capped at 8 s.
    fn default() -> Self {
        Self {
            base: Duration::from_millis(DEFAULT_BASE_MS),
            multiplier: DEFAULT_MULTIPLIER,
            cap: Duration::from_millis(DEFAULT_CAP_MS),
        }
    }
}
