//! Domain error model.

use thiserror::Error;

/// Result type used across the domain and store layers.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant maps to exactly one HTTP status at the API boundary:
/// `Validation` 400, `Unauthorized` 401, `NotFound` 404, `Inconsistency` and
/// `Storage` 500.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad input, duplicate unique key, or a refused business rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested entity does not exist. Carries a description of what was looked up.
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing/invalid credentials or a failed authorization policy.
    #[error("unauthorized")]
    Unauthorized,

    /// State that should be impossible (e.g. an authenticated user vanished mid-request).
    #[error("internal inconsistency: {0}")]
    Inconsistency(String),

    /// Persistence failure. The message is for logs only.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn inconsistency(msg: impl Into<String>) -> Self {
        Self::Inconsistency(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
