//! Shared error types for the darkroom workspace

use thiserror::Error;

/// Errors produced by the shared infrastructure utilities
#[derive(Error, Debug)]
pub enum CommonError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CommonError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CommonError>;
