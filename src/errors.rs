//! Errors for ISS recorder
use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IssRecorderError>;

/// Pipeline stage an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Fetch,
    Normalize,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::Fetch => "fetch",
            Stage::Normalize => "normalize",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum IssRecorderError {
    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    #[error("Bad response status: {0}")]
    BadStatusError(u16),

    #[error("Unable to decode response body: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("Unable to parse {field} as a decimal number: {value:?}")]
    ParseError { field: &'static str, value: String },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("Database error: {0}")]
    PersistError(#[from] sqlx::Error),

    #[error("Console write error: {0}")]
    EmitError(#[source] std::io::Error),

    #[error("Invalid stored position: {0:?}")]
    InvalidStoredPosition(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    #[error("Database connection error: {0}")]
    DatabaseConnectionError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),
}

impl IssRecorderError {
    /// Stage in which the error occurred, for diagnostics
    pub fn stage(&self) -> Stage {
        match self {
            IssRecorderError::NetworkError(_)
            | IssRecorderError::BadStatusError(_)
            | IssRecorderError::DecodeError(_) => Stage::Fetch,
            IssRecorderError::ParseError { .. } | IssRecorderError::OutOfRange { .. } => {
                Stage::Normalize
            }
            IssRecorderError::PersistError(_)
            | IssRecorderError::EmitError(_)
            | IssRecorderError::InvalidStoredPosition(_) => Stage::Persist,
            IssRecorderError::ConfigError(_)
            | IssRecorderError::ConfigurationError { .. }
            | IssRecorderError::DatabaseConnectionError(_)
            | IssRecorderError::MigrationError(_) => Stage::Setup,
        }
    }
}
