//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic validation failures. Ledger operations wrap this in their
/// own error type alongside lookup and stock failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Caller-supplied data is unacceptable.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Stored state breaks a quantity invariant.
    #[error("stock invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid {kind} {value:?}: {reason}")]
    InvalidId {
        kind: &'static str,
        value: String,
        reason: String,
    },
}

impl DomainError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(kind: &'static str, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidId {
            kind,
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// The offending field of a validation failure.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}
