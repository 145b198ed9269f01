// crates/guard/src/options.rs
//! Per-call breaker options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tripswitch_core::{DEFAULT_THRESHOLD, DEFAULT_TIMEOUT};

type Predicate<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Options for a guarded call
///
/// `T` and `E` are the guarded operation's success and error types. The two
/// predicates decide whether an outcome counts toward the trip threshold:
///
/// - `match_err` runs on `Err` outcomes and defaults to counting every
///   error.
/// - `match_ok` runs on `Ok` outcomes and defaults to counting none of
///   them; callers whose success type carries failure-denoting values (a
///   status code, say) opt in with [`CallOptions::with_match_ok`].
///
/// An `Ok` outcome matched by neither predicate clears the breaker's
/// accumulated failure count.
pub struct CallOptions<T, E> {
    threshold: u32,
    timeout: Duration,
    match_ok: Predicate<T>,
    match_err: Predicate<E>,
}

impl<T, E> CallOptions<T, E> {
    /// Creates options with the default threshold (10) and cooldown (900s)
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            timeout: DEFAULT_TIMEOUT,
            match_ok: Arc::new(|_| false),
            match_err: Arc::new(|_| true),
        }
    }

    /// Sets the number of counted failures before the breaker trips
    ///
    /// The threshold is a positive count; zero is clamped to 1, tripping on
    /// the first counted failure.
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    /// Sets the cooldown window after a trip
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the predicate deciding whether an `Ok` value counts as a failure
    pub fn with_match_ok(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.match_ok = Arc::new(predicate);
        self
    }

    /// Sets the predicate deciding whether an error counts toward the threshold
    pub fn with_match_err(
        mut self,
        predicate: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.match_err = Arc::new(predicate);
        self
    }

    /// Returns the trip threshold
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Returns the cooldown window
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Applies the `Ok` classification predicate
    pub fn counts_value(&self, value: &T) -> bool {
        (self.match_ok)(value)
    }

    /// Applies the error classification predicate
    pub fn counts_error(&self, error: &E) -> bool {
        (self.match_err)(error)
    }
}

impl<T, E> Default for CallOptions<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for CallOptions<T, E> {
    fn clone(&self) -> Self {
        Self {
            threshold: self.threshold,
            timeout: self.timeout,
            match_ok: Arc::clone(&self.match_ok),
            match_err: Arc::clone(&self.match_err),
        }
    }
}

impl<T, E> fmt::Debug for CallOptions<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("threshold", &self.threshold)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
