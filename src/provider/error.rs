//! Provider error classification.

use thiserror::Error;

/// Closed set of provider failure kinds the orchestrator reacts to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderErrorKind {
    /// The named resource does not exist.
    NotFound,
    /// The request was rejected as invalid, which includes name conflicts.
    InvalidInput,
    /// No usable credentials were found or they were rejected.
    Credentials,
    /// Any other provider or transport failure.
    Other,
}

/// Error returned by [`crate::provider::LightsailApi`] operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{operation} failed: {message}")]
pub struct ProviderError {
    /// Provider operation that failed (for example `CreateInstances`).
    pub operation: String,
    /// Classified failure kind.
    pub kind: ProviderErrorKind,
    /// Message reported by the provider.
    pub message: String,
}

impl ProviderError {
    /// Builds a provider error.
    #[must_use]
    pub fn new(
        operation: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            kind,
            message: message.into(),
        }
    }

    /// Convenience constructor for a not-found failure.
    #[must_use]
    pub fn not_found(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(operation, ProviderErrorKind::NotFound, message)
    }

    /// Returns `true` when the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ProviderErrorKind::NotFound
    }

    /// Returns `true` when the provider rejected the input (including
    /// name-already-in-use conflicts).
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        self.kind == ProviderErrorKind::InvalidInput
    }
}
