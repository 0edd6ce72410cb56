//! Error types for flagrun
//!
//! Configuration errors are returned synchronously to the caller and never
//! recorded in a scenario log. Execution errors surface as log entries; the
//! variants here only describe them.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for flagrun
#[derive(Error, Debug)]
pub enum Error {
    // === State/Configuration Errors ===
    #[error("Cannot {action} while scenario is {state}")]
    InvalidState { action: String, state: String },

    #[error("Scenario '{0}' cannot wait for itself")]
    SelfDependency(String),

    #[error("Scenario '{0}' has already been executed")]
    AlreadyExecuted(String),

    #[error("Scenario '{title}' is not ready: {reason}")]
    NotReady { title: String, reason: String },

    #[error("No async runtime available to execute scenario '{0}'")]
    NoRuntime(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // === Capability Errors ===
    #[error("'{capability}' is not supported by {backend}")]
    Unsupported { capability: String, backend: String },

    // === Adapter Errors ===
    #[error("No fetch adapter registered for {0} responses")]
    AdapterMissing(String),

    #[error("Request to {url} failed: {message}")]
    Fetch { url: String, message: String },

    // === Execution Errors ===
    #[error("{phase} timed out after {millis}ms")]
    PhaseTimeout { phase: String, millis: u64 },

    #[error("{0} suite(s) failed")]
    SuitesFailed(usize),

    // === Configuration File Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid state error
    pub fn invalid_state(action: &str, state: impl ToString) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            state: state.to_string(),
        }
    }

    /// Create an unsupported capability error
    pub fn unsupported(capability: &str, backend: &str) -> Self {
        Self::Unsupported {
            capability: capability.to_string(),
            backend: backend.to_string(),
        }
    }

    /// Create a fetch failure error
    pub fn fetch(url: &str, message: impl ToString) -> Self {
        Self::Fetch {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether this error is a missing capability rather than a real failure
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message() {
        let err = Error::invalid_state("change title", "executing");
        assert_eq!(
            err.to_string(),
            "Cannot change title while scenario is executing"
        );
    }

    #[test]
    fn test_unsupported_is_branchable() {
        let err = Error::unsupported("click", "json value");
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "'click' is not supported by json value");
    }
}
