// crates/core/src/breaker.rs
//! Per-key breaker state machine

use std::time::{Duration, Instant};

/// Default number of counted failures before a breaker trips
pub const DEFAULT_THRESHOLD: u32 = 10;

/// Default cooldown window after a trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);

/// Failure-tracking state for a single operation key
///
/// A `Breaker` is a plain value: every transition consumes the old state and
/// returns a complete new one, so callers never observe a partial update.
/// Concurrency is the owning unit's concern, not this type's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breaker {
    failure_count: u32,
    tripped: bool,
    tripped_at: Option<Instant>,
}

impl Breaker {
    /// Creates a fresh, untripped breaker
    pub fn new() -> Self {
        Self {
            failure_count: 0,
            tripped: false,
            tripped_at: None,
        }
    }

    /// Returns the number of counted failures
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Returns whether the breaker has tripped
    pub fn tripped(&self) -> bool {
        self.tripped
    }

    /// Returns the instant the breaker tripped, if it has
    pub fn tripped_at(&self) -> Option<Instant> {
        self.tripped_at
    }

    /// Records one counted failure, tripping once the count reaches `threshold`
    ///
    /// The trip instant is set only on the transition into the tripped state.
    /// Further increments while tripped advance the count but leave the
    /// original trip instant in place, so stragglers admitted before the trip
    /// cannot extend the cooldown window.
    #[must_use]
    pub fn increment(self, threshold: u32) -> Self {
        let failure_count = self.failure_count.saturating_add(1);

        if !self.tripped && failure_count >= threshold {
            Self {
                failure_count,
                tripped: true,
                tripped_at: Some(Instant::now()),
            }
        } else {
            Self {
                failure_count,
                ..self
            }
        }
    }

    /// Reports whether the breaker is tripped and still inside its cooldown
    ///
    /// An untripped breaker never blocks. A tripped one blocks only while the
    /// elapsed time since the trip is strictly less than `timeout`; a zero
    /// timeout therefore never protects.
    pub fn is_tripped(&self, timeout: Duration) -> bool {
        match self.tripped_at {
            Some(at) if self.tripped => at.elapsed() < timeout,
            _ => false,
        }
    }

    /// Clears a trip, returning a fresh breaker; a no-op while untripped
    #[must_use]
    pub fn reset_tripped(self) -> Self {
        if self.tripped {
            Self::new()
        } else {
            self
        }
    }

    /// Moves the trip instant back by `by`, touching nothing else
    ///
    /// Lets tests and operators exercise cooldown expiry deterministically
    /// instead of waiting out the window.
    #[must_use]
    pub fn rewind(self, by: Duration) -> Self {
        Self {
            tripped_at: self.tripped_at.map(|at| at.checked_sub(by).unwrap_or(at)),
            ..self
        }
    }
}

impl Default for Breaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_breaker_is_clean() {
        let breaker = Breaker::new();
        assert_eq!(breaker.failure_count(), 0);
        assert!(!breaker.tripped());
        assert!(breaker.tripped_at().is_none());
    }

    #[test]
    fn test_stays_closed_below_threshold() {
        let mut breaker = Breaker::new();
        for _ in 0..4 {
            breaker = breaker.increment(5);
        }

        assert_eq!(breaker.failure_count(), 4);
        assert!(!breaker.tripped());
        assert!(!breaker.is_tripped(Duration::from_secs(60)));
    }

    #[test]
    fn test_trips_at_threshold() {
        let mut breaker = Breaker::new();
        for _ in 0..3 {
            breaker = breaker.increment(3);
        }

        assert_eq!(breaker.failure_count(), 3);
        assert!(breaker.tripped());
        assert!(breaker.tripped_at().is_some());
        assert!(breaker.is_tripped(Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_timeout_never_protects() {
        let breaker = Breaker::new().increment(1);
        assert!(breaker.tripped());
        assert!(!breaker.is_tripped(Duration::from_secs(0)));
    }

    #[test]
    fn test_increment_while_tripped_keeps_trip_instant() {
        let breaker = Breaker::new().increment(1);
        let first_trip = breaker.tripped_at();
        assert!(first_trip.is_some());

        let breaker = breaker.increment(1);
        assert_eq!(breaker.failure_count(), 2);
        assert!(breaker.tripped());
        assert_eq!(breaker.tripped_at(), first_trip);
    }

    #[test]
    fn test_reset_tripped_is_noop_while_untripped() {
        let breaker = Breaker::new().increment(5).increment(5);
        let reset = breaker.reset_tripped();
        assert_eq!(reset, breaker);
        assert_eq!(reset.failure_count(), 2);
    }

    #[test]
    fn test_reset_tripped_clears_tripped_breaker() {
        let breaker = Breaker::new().increment(2).increment(2);
        assert!(breaker.tripped());

        let reset = breaker.reset_tripped();
        assert_eq!(reset.failure_count(), 0);
        assert!(!reset.tripped());
        assert!(reset.tripped_at().is_none());
    }

    #[test]
    fn test_rewind_expires_a_trip() {
        let breaker = Breaker::new().increment(1);
        assert!(breaker.is_tripped(Duration::from_secs(60)));

        let rewound = breaker.rewind(Duration::from_secs(120));
        assert!(!rewound.is_tripped(Duration::from_secs(60)));
        assert_eq!(rewound.failure_count(), breaker.failure_count());
        assert!(rewound.tripped());
    }

    #[test]
    fn test_rewind_untripped_is_noop() {
        let breaker = Breaker::new().increment(5);
        let rewound = breaker.rewind(Duration::from_secs(60));
        assert_eq!(rewound, breaker);
    }

    #[test]
    fn test_reset_after_expiry_starts_counter_from_zero() {
        let breaker = Breaker::new()
            .increment(2)
            .increment(2)
            .rewind(Duration::from_secs(120));
        assert!(!breaker.is_tripped(Duration::from_secs(60)));

        let breaker = breaker.reset_tripped().increment(2);
        assert_eq!(breaker.failure_count(), 1);
        assert!(!breaker.tripped());
    }
}
