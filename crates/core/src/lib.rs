// crates/core/src/lib.rs
//! Pure breaker state and shared error types for tripswitch
//!
//! This crate holds the per-key circuit breaker state machine as plain data
//! with value-to-value transitions, plus the error taxonomy guarded calls
//! surface. It has no concurrency primitives and no runtime dependency; the
//! `tripswitch-guard` crate wraps it with per-key ownership and call
//! orchestration.
//!
//! # Example
//!
//! ```rust
//! use tripswitch_core::Breaker;
//! use std::time::Duration;
//!
//! let breaker = Breaker::new().increment(2).increment(2);
//! assert!(breaker.is_tripped(Duration::from_secs(60)));
//! assert_eq!(breaker.reset_tripped().failure_count(), 0);
//! ```

mod breaker;
mod error;

pub use breaker::{Breaker, DEFAULT_THRESHOLD, DEFAULT_TIMEOUT};
pub use error::{BreakerError, BreakerResult};
