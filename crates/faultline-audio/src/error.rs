//! Error types for faultline-audio

use thiserror::Error;

/// Speech capture error type
#[derive(Debug, Error)]
pub enum Error {
    /// No speech recognition facility on this runtime
    #[error("speech capture unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Recognition stream reported a runtime failure
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Stop requested while not recording
    #[error("not recording")]
    NotRecording,

    /// Audio stream error
    #[error("audio stream error: {0}")]
    AudioStream(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
