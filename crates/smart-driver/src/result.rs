//! Result and error types for smart-driver.

use std::fmt::Display;

use thiserror::Error;
use tracing::warn;

use crate::strategy::Strategy;

/// Result type for operations performed by an automation driver
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type for smart-driver setup
pub type SmartResult<T> = Result<T, SmartError>;

/// Errors reported by the wrapped automation driver.
///
/// The resolver hands these back to callers untouched when both the native
/// lookup and the classification fallback fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No element matched the native strategy
    #[error("No such element ({strategy}: {selector}): {message}")]
    NoSuchElement {
        /// Strategy that was used
        strategy: Strategy,
        /// Raw selector passed to the driver
        selector: String,
        /// Driver supplied message
        message: String,
    },

    /// Classification could not place a labelled element
    #[error("{message}")]
    ElementNotFound {
        /// Normalized label
        label: String,
        /// Diagnostic message
        message: String,
    },

    /// Screenshot capture failed
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Page source / view hierarchy capture failed
    #[error("Page source unavailable: {message}")]
    PageSource {
        /// Error message
        message: String,
    },

    /// Tap or key injection failed
    #[error("Input injection failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// The driver session is unusable
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },
}

impl DriverError {
    /// Create a not-found error
    #[must_use]
    pub fn no_such_element(
        strategy: Strategy,
        selector: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::NoSuchElement {
            strategy,
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Check if this is a not-found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSuchElement { .. } | Self::ElementNotFound { .. }
        )
    }
}

/// Errors raised while building a [`crate::SmartDriver`]
#[derive(Debug, Error)]
pub enum SmartError {
    /// Session could not be initialized (screenshot or window size unreadable)
    #[error("Initialization failed: {message}")]
    Initialization {
        /// Error message
        message: String,
    },

    /// Configuration value is invalid
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Driver error during setup
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SmartError {
    /// Create an initialization error
    #[must_use]
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Errors talking to the classification service.
///
/// These never reach callers of the resolver: classification degrades to a
/// not-found outcome and usage reports are dropped.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("API error {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response was not the expected JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Explicit "try it, log it, move on" for calls whose failure must not stop
/// element resolution.
pub trait BestEffort<T> {
    /// Log the error at `warn` under `context` and discard it.
    fn best_effort(self, context: &str) -> Option<T>;
}

impl<T, E: Display> BestEffort<T> for Result<T, E> {
    fn best_effort(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "{context} failed, continuing");
                None
            }
        }
    }
}
