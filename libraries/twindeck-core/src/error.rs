/// Core error types for Twindeck
use thiserror::Error;

/// Result type alias using `DeckError`
pub type Result<T> = std::result::Result<T, DeckError>;

/// Core error type for Twindeck
#[derive(Error, Debug)]
pub enum DeckError {
    /// Metadata lookup errors
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Cue sheet grammar or validation errors
    #[error("Cue sheet error: {0}")]
    CueSheet(String),

    /// Malformed session data
    #[error("Session error: {0}")]
    Session(String),

    /// Mixer protocol failures
    #[error("Mixer protocol error: {0}")]
    Protocol(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Random selection over a playlist with no candidates
    #[error("cannot select from an empty playlist")]
    EmptyPlaylist,

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DeckError {
    /// Create a metadata error
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a cue sheet error
    pub fn cuesheet(msg: impl Into<String>) -> Self {
        Self::CueSheet(msg.into())
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
