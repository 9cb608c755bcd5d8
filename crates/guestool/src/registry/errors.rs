//! Errors raised by registry lookups and rule translation.

use thiserror::Error;

use crate::host::{CheckerError, CheckerKind};

/// Errors surfaced by [`MatcherRegistry`](super::MatcherRegistry) operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Id was never assigned, was removed, or its matcher has been dropped.
    #[error("no matcher with id '{id}'")]
    NotFound { id: String },

    /// A rule combines more than one primitive checker.
    #[error("conflicting match types '{first}' and '{second}' in one rule")]
    RuleConflict {
        first: CheckerKind,
        second: CheckerKind,
    },

    /// A descriptor cannot be turned into a working rule, or a rule has no
    /// structured form.
    #[error("invalid rule: {message}")]
    Validation { message: String },
}

impl RegistryError {
    /// Creates a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the failure.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::RuleConflict { .. } => "rule_conflict",
            Self::Validation { .. } => "validation",
        }
    }
}

impl From<CheckerError> for RegistryError {
    fn from(error: CheckerError) -> Self {
        Self::validation(error.to_string())
    }
}
