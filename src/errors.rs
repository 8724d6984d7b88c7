//! Iris error types
//!
//! One taxonomy for the whole payment core. Validation failures are
//! user-correctable, backend failures carry the backend text verbatim, and
//! transport failures are reduced to a generic message before they reach a
//! user.

use std::fmt;

use crate::types::{Currency, PaymentMethod};

/// Generic message shown when the underlying cause is not a structured
/// backend response.
pub const TRANSPORT_USER_MESSAGE: &str = "Unable to reach the Iris backend. Please try again.";

/// Iris payment core error type
#[derive(Debug, Clone, PartialEq)]
pub enum IrisError {
    // ==========================================================================
    // Local Errors
    // ==========================================================================
    /// A local precondition failed (amount out of range, missing selection)
    Validation(String),
    /// The selected method cannot be used for the active currency
    UnsupportedMethod {
        method: PaymentMethod,
        currency: Currency,
    },

    // ==========================================================================
    // Backend Errors
    // ==========================================================================
    /// The actor answered with an explicit `Err` tag
    Backend(String),
    /// A closed-enumeration value carried a tag we do not know
    UnknownVariant {
        type_name: &'static str,
        found: String,
    },
    /// The payload did not have the expected shape
    Decode(String),

    // ==========================================================================
    // Environment Errors
    // ==========================================================================
    /// Network or actor initialization failure
    Transport(String),
    /// Session blob storage failure
    Storage(String),
    /// The flow was cancelled while the request was in flight
    Cancelled,
}

impl fmt::Display for IrisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{}", msg),
            Self::UnsupportedMethod { method, currency } => write!(
                f,
                "{} cannot be used to pay in {}",
                method.display_name(),
                currency.code()
            ),
            Self::Backend(msg) => write!(f, "{}", msg),
            Self::UnknownVariant { type_name, found } => {
                write!(f, "Unknown {} variant: {}", type_name, found)
            }
            Self::Decode(msg) => write!(f, "Unexpected backend response: {}", msg),
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::Storage(msg) => write!(f, "Session storage error: {}", msg),
            Self::Cancelled => write!(f, "Payment cancelled"),
        }
    }
}

impl std::error::Error for IrisError {}

/// Result type alias for payment core operations
pub type IrisResult<T> = Result<T, IrisError>;

impl IrisError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Error produced when a backend call exceeds its deadline
    pub fn timeout(operation: &str, secs: u64) -> Self {
        Self::Backend(format!("{} timed out after {}s", operation, secs))
    }

    /// Check if this is a locally correctable input error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if retrying the same action may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Transport(_))
    }

    /// Message safe to show to a user
    ///
    /// Transport and decode failures never leak their internals.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => TRANSPORT_USER_MESSAGE.to_string(),
            Self::Decode(_) | Self::UnknownVariant { .. } => {
                "The Iris backend sent a response we could not read.".to_string()
            }
            Self::Storage(_) => "Could not restore the payment session.".to_string(),
            Self::Backend(msg) if msg.trim().is_empty() => "Payment failed".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for IrisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_is_generic() {
        let err = IrisError::Transport("tcp connect error: os error 111".to_string());
        assert_eq!(err.user_message(), TRANSPORT_USER_MESSAGE);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_backend_message_passes_through() {
        let err = IrisError::backend("Invoice not found");
        assert_eq!(err.user_message(), "Invoice not found");
        assert_eq!(IrisError::backend("  ").user_message(), "Payment failed");
    }

    #[test]
    fn test_unsupported_method_display() {
        let err = IrisError::UnsupportedMethod {
            method: PaymentMethod::PlugWallet,
            currency: Currency::Usd,
        };
        assert_eq!(err.to_string(), "Plug Wallet cannot be used to pay in USD");
        assert!(!err.is_validation());
    }
}
