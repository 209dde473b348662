//! Error types for soundbridge.
//!
//! The transport itself never fails: overflow evicts and underrun plays
//! silence. These errors only surface from the outer session layer.

use thiserror::Error;

/// Result type alias using soundbridge's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for soundbridge.
#[derive(Error, Debug)]
pub enum Error {
    // Device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Audio session is closed")]
    SessionClosed,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Failed to parse config: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl Error {
    /// Returns true if the error came from the audio device rather than from
    /// the caller's input.
    pub const fn is_device_error(&self) -> bool {
        matches!(self, Self::AudioOutput(_) | Self::SessionClosed)
    }
}
