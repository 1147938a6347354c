//! Error handling module for pkgwizard
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Library code returns these types; step actions and the launcher wrap them
//! in `anyhow` with context.

use thiserror::Error;

/// Main error type for the wizard
#[derive(Error, Debug)]
pub enum WizardError {
    /// IO errors (ledger files, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (manifest, settings, backend selection)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (ledger fields, descriptors)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Package name already recorded in the install ledger
    #[error("Package already recorded in install ledger: {0}")]
    DuplicatePackage(String),

    /// Dialog backend errors (terminal setup, dialog(1) invocation)
    #[error("Dialog error: {0}")]
    Dialog(String),

    /// Wizard state errors (appending after start, invalid page id)
    #[error("State error: {0}")]
    State(String),

    /// A scenario step failed while running in fail-fast mode
    #[error("Scenario step '{name}' failed: {reason}")]
    Step { name: String, reason: String },

    /// External command errors
    #[error("System error: {0}")]
    System(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for wizard operations
pub type Result<T> = std::result::Result<T, WizardError>;

impl WizardError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a dialog error
    pub fn dialog(msg: impl Into<String>) -> Self {
        Self::Dialog(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a system error
    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// Create a step failure error
    pub fn step(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Step {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
