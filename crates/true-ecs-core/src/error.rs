//! Error types for true-ecs-core

use thiserror::Error;

/// Result type alias for true-ecs-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in true-ecs-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Malformed pixel-data table
    #[error("table error in '{path}': {message}")]
    Table {
        /// File the table was read from
        path: String,
        /// Description of the error
        message: String,
    },

    /// Missing or unsupported WCS calibration
    #[error("WCS error: {message}")]
    Wcs {
        /// Description of the error
        message: String,
    },

    /// Celestial frame that cannot be handled
    #[error("frame error: {message}")]
    Frame {
        /// Description of the error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::ConfigInvalid {
            message: message.into(),
        }
    }

    pub(crate) fn wcs(message: impl Into<String>) -> Self {
        Error::Wcs {
            message: message.into(),
        }
    }
}
