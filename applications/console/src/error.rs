/// Console application errors
use thiserror::Error;
use twindeck_playback::PlaybackError;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mixer error: {0}")]
    Mixer(String),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Console thread is gone")]
    Disconnected,

    #[error("Console thread panicked")]
    Panicked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
