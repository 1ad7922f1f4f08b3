//! Error types for the LearnPal tutoring service
//!
//! This module provides error handling using thiserror for structured error
//! definitions and anyhow for propagation at the binary boundary.
//!
//! Text-generation failures are deliberately absent here: they are recovered
//! inside the tutor and surface as [`crate::services::CollaboratorFailure`].

use thiserror::Error;

/// Main error type for LearnPal operations
#[derive(Error, Debug)]
pub enum LearnPalError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Learner not found
    #[error("Learner not found: {0}")]
    LearnerNotFound(i64),

    /// Concept not found
    #[error("Concept not found: {0}")]
    ConceptNotFound(String),

    /// Resource belongs to another tenant
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rejected input (bad birth month, rating outside ±1, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for LearnPal operations
pub type Result<T> = std::result::Result<T, LearnPalError>;

/// Convert anyhow::Error to LearnPalError
impl From<anyhow::Error> for LearnPalError {
    fn from(err: anyhow::Error) -> Self {
        LearnPalError::Other(err.to_string())
    }
}

impl From<rusqlite::Error> for LearnPalError {
    fn from(err: rusqlite::Error) -> Self {
        LearnPalError::Database(err.to_string())
    }
}
