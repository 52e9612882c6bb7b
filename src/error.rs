//! Error types for the node admin context hand-off.

use thiserror::Error;

/// Failures raised by the context manager.
///
/// A freeze wait that runs out of time is not an error; `set_frozen` reports it
/// by returning `false`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ManagerError {
    #[error("Interrupted while waiting for the next context")]
    Interrupted,
}

/// Configuration and logging setup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}
