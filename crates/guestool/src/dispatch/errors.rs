//! Error types for request dispatch failures.
//!
//! Every failure a single request can hit is caught at the router boundary
//! and turned into an error payload by [`DispatchError::payload`], so one bad
//! request never takes the connection down.

use serde_json::{Value, json};
use thiserror::Error;

use crate::registry::RegistryError;

/// Payload for an unknown `/info/` verb.
pub const UNKNOWN_INFO: &str = "unknown info type";
/// Payload for an unknown `/action/` verb or an unroutable namespace.
pub const UNKNOWN_ACTION: &str = "unknown action type";

/// Errors surfaced while routing or running a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No info provider is registered under the name.
    #[error("unknown info type: {name}")]
    UnknownInfo { name: String },

    /// No action is registered under the name, or the verb is unroutable.
    #[error("unknown action type: {name}")]
    UnknownAction { name: String },

    /// `opct` does not match what the operation expects.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An embedding-supplied provider failed.
    #[error("provider failed: {message}")]
    Provider { message: String },

    /// The operation's result could not be serialised.
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DispatchError {
    /// Creates an unknown info error.
    pub fn unknown_info(name: impl Into<String>) -> Self {
        Self::UnknownInfo { name: name.into() }
    }

    /// Creates an unknown action error.
    pub fn unknown_action(name: impl Into<String>) -> Self {
        Self::UnknownAction { name: name.into() }
    }

    /// Creates an invalid arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates a provider error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the failure.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownInfo { .. } => "unknown_info",
            Self::UnknownAction { .. } => "unknown_action",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::Registry(error) => error.kind(),
            Self::Provider { .. } => "provider",
            Self::Serialize(_) => "serialize",
        }
    }

    /// JSON error payload carried in the response's `opct`.
    ///
    /// Unknown verbs produce exactly `{"error": "unknown info type"}` or
    /// `{"error": "unknown action type"}`; everything else carries the
    /// message and a `kind` discriminator.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::UnknownInfo { .. } => json!({ "error": UNKNOWN_INFO }),
            Self::UnknownAction { .. } => json!({ "error": UNKNOWN_ACTION }),
            other => json!({ "error": other.to_string(), "kind": other.kind() }),
        }
    }
}
