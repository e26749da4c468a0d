//! Time source abstraction.
//!
//! Abstracted to allow testing with deterministic time; expiry and
//! backoff logic must be checkable without sleeping.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Source of "now" for all subsystems.
pub trait TimeSource: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable time source for tests.
#[derive(Clone)]
pub struct MockTimeSource {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl MockTimeSource {
    /// Starts the clock at `initial`.
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(initial)),
        }
    }

    /// Advances the clock.
    pub fn advance(&self, delta: Duration) {
        *self.now.write() += delta;
    }

    /// Jumps the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.write() = instant;
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_time_source_is_recent() {
        let now = SystemTimeSource.now();
        let year_2020 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(now > year_2020);
    }

    #[test]
    fn test_mock_time_source() {
        let start = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let clock = MockTimeSource::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), start + Duration::hours(3));

        let later = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_mock_clones_share_state() {
        let start = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let clock = MockTimeSource::new(start);
        let view = clock.clone();
        clock.advance(Duration::minutes(5));
        assert_eq!(view.now(), start + Duration::minutes(5));
    }
}
