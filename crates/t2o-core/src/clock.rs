//! Injectable time source
//!
//! Token expiry, door timers and reconnect backoff all go through `Clock`
//! so tests can control wall-clock time and run timers on paused tokio time.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A source of wall-clock time and delays
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Thread-safe wrapper for a Clock
pub type SharedClock = Arc<dyn Clock>;

/// The real clock: `Utc::now` and tokio timers
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

/// A clock whose wall-clock time only moves when told to
///
/// `sleep` still waits on tokio time, which tests pause and advance.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock starting at the current time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a clock starting at a specific time
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(RwLock::new(time)),
        }
    }

    /// Set the current time
    pub fn set(&self, time: DateTime<Utc>) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = time;
    }

    /// Advance the current time
    pub fn advance(&self, duration: chrono::Duration) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let initial = clock.now();

        clock.advance(chrono::Duration::seconds(60));

        assert_eq!((clock.now() - initial).num_seconds(), 60);
    }

    #[test]
    fn test_manual_clock_set() {
        let fixed = DateTime::parse_from_rfc3339("2025-06-15T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let clock = ManualClock::new();
        clock.set(fixed);
        assert_eq!(clock.now(), fixed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_uses_tokio_time() {
        let clock = ManualClock::new();
        let start = tokio::time::Instant::now();

        clock.sleep(Duration::from_secs(30)).await;

        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_leaves_wall_clock_alone() {
        let clock = ManualClock::new();
        let wall = clock.now();

        clock.sleep(Duration::from_secs(3600)).await;

        assert_eq!(clock.now(), wall);
    }
}
