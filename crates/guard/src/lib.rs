// crates/guard/src/lib.rs
//! Keyed circuit breakers for fault-tolerant operations
//!
//! A [`CircuitGuard`] wraps potentially failing operations, identified by a
//! stable caller-supplied key, and tracks failures per key. Once a key
//! accumulates enough counted failures its breaker trips, and further calls
//! for that key are short-circuited for a cooldown window without running
//! the operation.
//!
//! Each key's state lives in its own unit task; the registry creates units
//! lazily, serializes racing first-time lookups, and evicts entries when
//! units terminate.
//!
//! # Example
//!
//! ```rust
//! use tripswitch_guard::{BreakerError, CallOptions, CircuitGuard};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let guard = CircuitGuard::new();
//! let options = CallOptions::new()
//!     .with_threshold(2)
//!     .with_timeout(Duration::from_secs(30));
//!
//! for _ in 0..2 {
//!     let _ = guard
//!         .call("billing", &options, || async { Err::<(), _>("down") })
//!         .await;
//! }
//!
//! // Third call is short-circuited; the operation does not run.
//! let result = guard
//!     .call("billing", &options, || async { Err::<(), _>("down") })
//!     .await;
//! assert!(matches!(result, Err(BreakerError::Tripped)));
//! # }
//! ```

mod guard;
mod options;
mod registry;
mod unit;

pub use guard::CircuitGuard;
pub use options::CallOptions;
pub use registry::{Registry, RegistryClosed};
pub use tripswitch_core::{Breaker, BreakerError, BreakerResult, DEFAULT_THRESHOLD, DEFAULT_TIMEOUT};
pub use unit::{BreakerHandle, UnitGone};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_exports_accessible() {
        let _: CallOptions<(), String> = CallOptions::default();
        let _: CircuitGuard<String> = CircuitGuard::new();
        let _: Registry<String> = Registry::new();
        let _: Breaker = Breaker::default();
        let _: BreakerError<String> = BreakerError::Tripped;
    }
}
