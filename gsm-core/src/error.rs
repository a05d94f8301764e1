use thiserror::Error;

/// Main error type for gsm operations
#[derive(Error, Debug)]
pub enum GsmError {
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("No matching terminator (partial response: {partial:?})")]
    NoMatch { partial: String },

    #[error("Driver error {code}: {message}")]
    Driver { code: i32, message: String },

    #[error("Command failed: {0:?}")]
    CommandFailed(String),

    #[error("A send is already in flight")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GsmError {
    /// Whether this failure is a timeout a caller may reasonably retry
    pub fn is_timeout(&self) -> bool {
        matches!(self, GsmError::Timeout)
    }
}

/// Result type alias for gsm operations
pub type GsmResult<T> = Result<T, GsmError>;
