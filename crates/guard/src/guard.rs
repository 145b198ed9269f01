// crates/guard/src/guard.rs
//! Call orchestration: the public breaker entry point

use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use tripswitch_core::{BreakerError, BreakerResult};

use crate::options::CallOptions;
use crate::registry::Registry;
use crate::unit::{Admission, BreakerHandle};

/// Guards keyed operations behind per-key circuit breakers
///
/// Each distinct key gets its own breaker, created lazily on first call.
/// Identity, not behavior, determines breaker sharing: two closures with
/// identical logic are separate breakers unless the caller reuses one key
/// for both.
///
/// # Example
///
/// ```rust
/// use tripswitch_guard::{CallOptions, CircuitGuard};
/// use std::time::Duration;
///
/// # async fn example() {
/// let guard = CircuitGuard::new();
/// let options = CallOptions::new()
///     .with_threshold(3)
///     .with_timeout(Duration::from_secs(30));
///
/// let result = guard
///     .call("catalog-service", &options, || async {
///         Ok::<_, String>("response")
///     })
///     .await;
/// assert!(result.is_ok());
/// # }
/// ```
#[derive(Debug)]
pub struct CircuitGuard<K> {
    registry: Registry<K>,
}

impl<K> CircuitGuard<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// Creates a guard with its own registry instance
    ///
    /// Must be called inside a tokio runtime; the registry spawns tasks.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    /// Invokes `operation` under the breaker registered for `key`
    ///
    /// If the key's breaker is tripped and inside its cooldown window the
    /// call returns [`BreakerError::Tripped`] without running the operation
    /// or touching breaker state. Otherwise any expired trip is cleared
    /// first, so the call that discovers expiry already counts against a
    /// clean slate, and the operation runs inline on the caller's task.
    ///
    /// The outcome is then classified through `options`: a counted failure
    /// increments the breaker (possibly tripping it), an uncounted `Ok`
    /// clears the accumulated count, and in every case the operation's own
    /// result reaches the caller unchanged — errors wrapped only in the
    /// transparent [`BreakerError::Operation`] variant.
    ///
    /// # Errors
    ///
    /// [`BreakerError::Tripped`] on short-circuit,
    /// [`BreakerError::RegistryUnavailable`] when no breaker unit could be
    /// resolved, and [`BreakerError::Operation`] passing through the
    /// operation's own error.
    pub async fn call<F, Fut, T, E>(
        &self,
        key: K,
        options: &CallOptions<T, E>,
        operation: F,
    ) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut handle = self.resolve(&key)?;
        let admission = match handle.admit(options.timeout()).await {
            Ok(admission) => admission,
            // The unit died between resolution and first use; a fresh unit
            // gets one more chance before the call is declared unroutable.
            Err(_) => {
                handle = self.resolve(&key)?;
                handle
                    .admit(options.timeout())
                    .await
                    .map_err(|gone| BreakerError::RegistryUnavailable(gone.to_string()))?
            }
        };

        if admission == Admission::Blocked {
            return Err(BreakerError::Tripped);
        }

        match operation().await {
            Ok(value) => {
                if options.counts_value(&value) {
                    Self::record_failure(&handle, options.threshold()).await;
                } else if handle.record_success().await.is_err() {
                    log::warn!("breaker unit terminated before success was recorded");
                }
                Ok(value)
            }
            Err(error) => {
                if options.counts_error(&error) {
                    Self::record_failure(&handle, options.threshold()).await;
                }
                Err(BreakerError::Operation(error))
            }
        }
    }

    /// Looks up the breaker handle for `key` without creating one
    pub fn find(&self, key: &K) -> Option<BreakerHandle> {
        self.registry.find(key)
    }

    /// Moves the trip instant for `key`'s breaker back by `by`
    ///
    /// Returns false when no live breaker exists for the key. Mutates only
    /// the trip instant; count and trip status are untouched.
    pub async fn rewind(&self, key: &K, by: Duration) -> bool {
        match self.registry.find(key) {
            Some(handle) => handle.rewind(by).await.is_ok(),
            None => false,
        }
    }

    /// Tears down the breaker for `key`; the next call starts fresh
    pub fn remove(&self, key: &K) {
        self.registry.remove(key);
    }

    /// Shuts down the guard's registry and every breaker unit
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    fn resolve<E>(&self, key: &K) -> Result<BreakerHandle, BreakerError<E>> {
        self.registry
            .get_or_create(key)
            .map_err(|closed| BreakerError::RegistryUnavailable(closed.to_string()))
    }

    async fn record_failure(handle: &BreakerHandle, threshold: u32) {
        if handle.record_failure(threshold).await.is_err() {
            log::warn!("breaker unit terminated before failure was recorded");
        }
    }
}

impl<K> Default for CircuitGuard<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
