//! Error types for playback management

use thiserror::Error;
use twindeck_core::DeckError;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Random selection found no usable row
    #[error("cannot select from an empty playlist")]
    EmptyPlaylist,

    /// A session line or packed entry could not be decoded
    #[error("Session data corrupt: {0}")]
    SessionCorruption(String),

    /// The mixer went away or replied with garbage
    #[error("Mixer protocol failure: {0}")]
    Protocol(String),

    /// Operation not allowed in the lane's current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybackError {
    /// Create a session corruption error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::SessionCorruption(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

impl From<PlaybackError> for DeckError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::EmptyPlaylist => DeckError::EmptyPlaylist,
            PlaybackError::SessionCorruption(msg) => DeckError::Session(msg),
            PlaybackError::Protocol(msg) => DeckError::Protocol(msg),
            PlaybackError::InvalidOperation(msg) => DeckError::InvalidInput(msg),
            PlaybackError::Io(e) => DeckError::Io(e),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
