//! Error handling for the pi_pins toolkit.

/// A specialized `Result` type for pi_pins operations.
pub type Result<T> = std::result::Result<T, PinError>;

/// The main error type for GPIO toolkit operations.
#[derive(Debug, thiserror::Error)]
pub enum PinError {
    /// I/O operation failed (log files, terminal)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid numbering mode, direction, pull or value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile file or named pin set does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Profile content has the wrong shape
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Any failure reported by the GPIO driver
    #[error("GPIO error: {0}")]
    Hardware(String),
}

impl PinError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new invalid-format error
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a new hardware error
    pub fn hardware_error(msg: impl Into<String>) -> Self {
        Self::Hardware(msg.into())
    }
}

impl From<serde_json::Error> for PinError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

impl From<serde_yaml::Error> for PinError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}
