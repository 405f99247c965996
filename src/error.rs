//! Error types for the unified tool router.
//!
//! This module provides the error taxonomy used across the router:
//!
//! ```text
//! RouterError (top-level)
//! ├── Provider(ProviderError)
//! ├── Execution(ExecutionError)
//! ├── Preference(PreferenceError)
//! └── Config(String)
//! ```
//!
//! Execution failures are additionally classified into an
//! [`ExecutionErrorKind`] and tagged with a `recoverable` flag that
//! drives fallback eligibility: permission failures and "not found"
//! conditions never trigger a fallback, everything else may.
//!
//! # Examples
//!
//! ```rust
//! use tool_router::error::{ExecutionError, ExecutionErrorKind};
//!
//! let err = ExecutionError::classify("connection refused by upstream");
//! assert_eq!(err.kind, ExecutionErrorKind::Network);
//! assert!(err.recoverable);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Top-level error type for the unified tool router.
///
/// All sub-error types convert to `RouterError` via `From`:
///
/// ```rust
/// use tool_router::error::{RouterError, ProviderError};
///
/// let provider_error = ProviderError::ToolNotFound("read_file".to_string());
/// let router_error: RouterError = provider_error.into();
/// ```
#[derive(Debug, Error)]
pub enum RouterError {
    /// A provider-facing failure (listing or calling tools).
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A classified execution failure.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Preference load/save failure.
    #[error("Preference error: {0}")]
    Preference(#[from] PreferenceError),

    /// Router configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested tool does not exist in the current catalog.
    #[error("Tool not found in catalog: {0}")]
    ToolNotFound(String),
}

/// Errors surfaced by tool providers.
///
/// These are the raw failures a [`crate::provider::ToolProvider`]
/// implementation may return; the execution router maps them into the
/// classified [`ExecutionError`] taxonomy before they reach callers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connectivity failure while talking to the provider.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The provider does not expose the requested tool.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The provider rejected the call for authorization reasons.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The call observed its cancellation token and stopped.
    #[error("Call cancelled")]
    Cancelled,

    /// The provider executed the tool and the tool itself failed.
    #[error("Tool call failed: {0}")]
    CallFailed(String),

    /// Catch-all for unexpected provider failures.
    #[error("Internal provider error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Classification of an execution failure.
///
/// Mirrors the wire-visible error taxonomy: every failed execution is
/// tagged with exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionErrorKind {
    /// Bad or missing parameters, caught before dispatch.
    #[serde(rename = "validation_error")]
    Validation,
    /// The per-execution cancellation token fired.
    #[serde(rename = "timeout_error")]
    Timeout,
    /// Provider connectivity failure.
    #[serde(rename = "network_error")]
    Network,
    /// Authorization failure. Never recoverable.
    #[serde(rename = "permission_error")]
    Permission,
    /// Anything else the provider reported.
    #[serde(rename = "execution_error")]
    Execution,
}

impl ExecutionErrorKind {
    /// Stable string tag for this kind, used in events and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionErrorKind::Validation => "validation_error",
            ExecutionErrorKind::Timeout => "timeout_error",
            ExecutionErrorKind::Network => "network_error",
            ExecutionErrorKind::Permission => "permission_error",
            ExecutionErrorKind::Execution => "execution_error",
        }
    }
}

impl std::fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, caller-visible execution failure.
///
/// `recoverable` controls fallback eligibility: the execution router
/// only attempts a fallback tool for recoverable failures.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ExecutionError {
    /// The error classification.
    pub kind: ExecutionErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Whether a fallback tool may be attempted.
    pub recoverable: bool,
}

impl ExecutionError {
    /// Creates an error of the given kind with default recoverability.
    ///
    /// Permission errors default to non-recoverable; every other kind
    /// defaults to recoverable.
    pub fn new(kind: ExecutionErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let recoverable =
            kind != ExecutionErrorKind::Permission && !is_not_found_message(&message);
        Self {
            kind,
            message,
            recoverable,
        }
    }

    /// Creates a validation error (missing/invalid parameters).
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ExecutionErrorKind::Validation,
            message: message.into(),
            recoverable: true,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ExecutionErrorKind::Timeout,
            message: message.into(),
            recoverable: true,
        }
    }

    /// Classifies a raw error message into the taxonomy by pattern.
    ///
    /// The specific keyword lists are deliberately simple substring
    /// checks; they are pure data and independently testable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tool_router::error::{ExecutionError, ExecutionErrorKind};
    ///
    /// assert_eq!(
    ///     ExecutionError::classify("request timed out").kind,
    ///     ExecutionErrorKind::Timeout
    /// );
    /// assert!(!ExecutionError::classify("permission denied").recoverable);
    /// assert!(!ExecutionError::classify("tool not found").recoverable);
    /// ```
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let kind = if lower.contains("timeout") || lower.contains("timed out") {
            ExecutionErrorKind::Timeout
        } else if lower.contains("permission")
            || lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("access denied")
        {
            ExecutionErrorKind::Permission
        } else if lower.contains("network")
            || lower.contains("connection")
            || lower.contains("unreachable")
            || lower.contains("dns")
        {
            ExecutionErrorKind::Network
        } else if lower.contains("validation")
            || lower.contains("invalid parameter")
            || lower.contains("missing required")
        {
            ExecutionErrorKind::Validation
        } else {
            ExecutionErrorKind::Execution
        };

        let recoverable =
            kind != ExecutionErrorKind::Permission && !is_not_found_message(&lower);

        Self {
            kind,
            message,
            recoverable,
        }
    }
}

fn is_not_found_message(message: &str) -> bool {
    message.to_lowercase().contains("not found")
}

impl From<ProviderError> for ExecutionError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Connection(msg) => ExecutionError {
                kind: ExecutionErrorKind::Network,
                message: msg,
                recoverable: true,
            },
            ProviderError::ToolNotFound(name) => ExecutionError {
                kind: ExecutionErrorKind::Execution,
                message: format!("Tool not found: {name}"),
                recoverable: false,
            },
            ProviderError::PermissionDenied(msg) => ExecutionError {
                kind: ExecutionErrorKind::Permission,
                message: msg,
                recoverable: false,
            },
            ProviderError::Cancelled => ExecutionError {
                kind: ExecutionErrorKind::Timeout,
                message: "call cancelled".to_string(),
                recoverable: true,
            },
            ProviderError::CallFailed(msg) => ExecutionError::classify(msg),
            ProviderError::Internal(e) => ExecutionError::classify(e.to_string()),
        }
    }
}

/// Preference persistence errors.
///
/// These never abort router startup; the preference manager falls back
/// to defaults and logs a warning.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// I/O failure against the backing store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The store rejected the operation.
    #[error("Store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_timeout() {
        let err = ExecutionError::classify("operation timed out after 30s");
        assert_eq!(err.kind, ExecutionErrorKind::Timeout);
        assert!(err.recoverable);
    }

    #[test]
    fn test_classify_network() {
        let err = ExecutionError::classify("connection refused");
        assert_eq!(err.kind, ExecutionErrorKind::Network);
        assert!(err.recoverable);
    }

    #[test]
    fn test_classify_permission_not_recoverable() {
        let err = ExecutionError::classify("403 Forbidden");
        assert_eq!(err.kind, ExecutionErrorKind::Permission);
        assert!(!err.recoverable);
    }

    #[test]
    fn test_classify_not_found_not_recoverable() {
        let err = ExecutionError::classify("tool 'frobnicate' not found");
        assert_eq!(err.kind, ExecutionErrorKind::Execution);
        assert!(!err.recoverable);
    }

    #[test]
    fn test_classify_validation() {
        let err = ExecutionError::classify("missing required field 'path'");
        assert_eq!(err.kind, ExecutionErrorKind::Validation);
        assert!(err.recoverable);
    }

    #[test]
    fn test_classify_default_execution() {
        let err = ExecutionError::classify("something exploded");
        assert_eq!(err.kind, ExecutionErrorKind::Execution);
        assert!(err.recoverable);
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(ExecutionErrorKind::Validation.as_str(), "validation_error");
        assert_eq!(ExecutionErrorKind::Timeout.as_str(), "timeout_error");
        assert_eq!(ExecutionErrorKind::Network.as_str(), "network_error");
        assert_eq!(ExecutionErrorKind::Permission.as_str(), "permission_error");
        assert_eq!(ExecutionErrorKind::Execution.as_str(), "execution_error");
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: ExecutionError = ProviderError::Connection("no route to host".to_string()).into();
        assert_eq!(err.kind, ExecutionErrorKind::Network);

        let err: ExecutionError = ProviderError::Cancelled.into();
        assert_eq!(err.kind, ExecutionErrorKind::Timeout);

        let err: ExecutionError = ProviderError::ToolNotFound("x".to_string()).into();
        assert!(!err.recoverable);

        let err: ExecutionError =
            ProviderError::PermissionDenied("no api key".to_string()).into();
        assert_eq!(err.kind, ExecutionErrorKind::Permission);
        assert!(!err.recoverable);
    }

    #[test]
    fn test_router_error_from_sub_errors() {
        let err: RouterError = ProviderError::Cancelled.into();
        assert!(matches!(err, RouterError::Provider(_)));

        let err: RouterError = ExecutionError::timeout("t").into();
        assert!(matches!(err, RouterError::Execution(_)));
    }

    #[test]
    fn test_execution_error_display() {
        let err = ExecutionError::validation("missing required field 'a'");
        assert_eq!(
            err.to_string(),
            "validation_error: missing required field 'a'"
        );
    }

    #[test]
    fn test_execution_error_serde_roundtrip() {
        let err = ExecutionError::timeout("deadline exceeded");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("timeout_error"));
        let back: ExecutionError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
