//! Time source used by the collector and the scheduler.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Wall-clock reads and timed suspension, injectable for tests.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// The system clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock frozen at one instant. Sleeping still goes through the tokio
/// timer so paused-time tests keep control over it.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(any(test, feature = "test-utils"))]
impl FixedClock {
    /// Fixed at `secs` seconds after the Unix epoch.
    pub fn at_epoch(secs: i64) -> Self {
        Self(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock that moves forward by `step` seconds after every `now()` read.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct SteppingClock {
    next: std::sync::atomic::AtomicI64,
    step: i64,
}

#[cfg(any(test, feature = "test-utils"))]
impl SteppingClock {
    /// First read returns `secs` seconds after the Unix epoch.
    pub fn starting_at(secs: i64, step: i64) -> Self {
        Self {
            next: std::sync::atomic::AtomicI64::new(secs),
            step,
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self
            .next
            .fetch_add(self.step, std::sync::atomic::Ordering::SeqCst);
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepping_clock_advances_per_read() {
        let clock = SteppingClock::starting_at(1_000, 60);
        assert_eq!(clock.now().timestamp(), 1_000);
        assert_eq!(clock.now().timestamp(), 1_060);
        assert_eq!(clock.now().timestamp(), 1_120);
    }

    #[test]
    fn test_fixed_clock_never_moves() {
        let clock = FixedClock::at_epoch(1_643_889_600);
        assert_eq!(clock.now(), clock.now());
    }
}
