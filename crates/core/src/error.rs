// crates/core/src/error.rs
//! Error types for guarded calls

use thiserror::Error;

/// Result type for guarded calls
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

/// Errors surfaced by a guarded call
///
/// Operation-level failures pass through unchanged in `Operation`; only the
/// breaker's own short-circuit decision and registry availability introduce
/// new error values.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker for this key is tripped and inside its cooldown window;
    /// the operation was not invoked
    #[error("circuit breaker tripped; call short-circuited")]
    Tripped,

    /// The registry could not produce a breaker unit for this key;
    /// the operation was not invoked
    #[error("breaker registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// The guarded operation's own error, re-propagated unchanged
    #[error(transparent)]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// Returns true for the short-circuit variant
    pub fn is_tripped(&self) -> bool {
        matches!(self, Self::Tripped)
    }

    /// Extracts the operation's original error, if this is the pass-through variant
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tripped_error_display() {
        let err: BreakerError<String> = BreakerError::Tripped;
        assert!(err.to_string().contains("short-circuited"));
        assert!(err.is_tripped());
    }

    #[test]
    fn test_registry_unavailable_display() {
        let err: BreakerError<String> = BreakerError::RegistryUnavailable("shut down".to_string());
        assert!(err.to_string().contains("registry unavailable"));
        assert!(err.to_string().contains("shut down"));
        assert!(!err.is_tripped());
    }

    #[test]
    fn test_operation_error_passes_through() {
        let err: BreakerError<String> = BreakerError::Operation("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.into_operation(), Some("connection refused".to_string()));
    }

    #[test]
    fn test_into_operation_on_tripped_is_none() {
        let err: BreakerError<String> = BreakerError::Tripped;
        assert!(err.into_operation().is_none());
    }
}
