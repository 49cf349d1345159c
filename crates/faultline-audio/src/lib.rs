//! Faultline Audio - Speech Capture
//!
//! This crate provides the speech capture adapter for Faultline:
//! - `RecognitionBackend` trait for continuous recognition streams
//! - `SpeechCapture`: finalized vs interim transcript, auto-restart, clean stop
//! - Whisper API chunk backend (requires `OPENAI_API_KEY`)
//!
//! # Features
//!
//! - `whisper` (default): Enable the Whisper API backend
//!
//! # Usage
//!
//! ```rust,ignore
//! use faultline_audio::{detect_backend, SpeechCapture, SpeechConfig};
//!
//! let detected = detect_backend(&SpeechConfig::default());
//! let (backend, feed) = detected.map(|d| (d.backend, d.feed)).unzip();
//! let mut capture = SpeechCapture::new(backend);
//!
//! capture.start()?;
//! while let Some(update) = capture.next_update().await? {
//!     println!("{}", update.display_text());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use backend::{
    AudioChunk, AudioFeed, EventSender, RecognitionBackend, RecognitionEvent, TranscriptSegment,
};
pub use capture::{SpeechCapture, TranscriptUpdate};
pub use config::SpeechConfig;
pub use error::{Error, Result};
#[cfg(feature = "whisper")]
pub use whisper::{read_wav_chunks, samples_to_wav, WhisperChunkBackend};

/// A recognition backend plus the feed that pushes audio into it
pub struct DetectedBackend {
    /// The backend to hand to [`SpeechCapture::new`]
    pub backend: Box<dyn RecognitionBackend>,
    /// Audio input for the backend
    pub feed: AudioFeed,
}

/// Check if STT is available (OPENAI_API_KEY set)
#[must_use]
pub fn stt_available() -> bool {
    cfg!(feature = "whisper") && std::env::var("OPENAI_API_KEY").is_ok()
}

/// Pick a backend for this runtime, or `None` when speech capture is unavailable
#[must_use]
pub fn detect_backend(config: &SpeechConfig) -> Option<DetectedBackend> {
    match config.backend.to_ascii_lowercase().as_str() {
        "none" => {
            tracing::info!("Speech capture disabled by configuration");
            None
        }
        "auto" | "whisper" => whisper_backend(config),
        other => {
            tracing::warn!(backend = other, "Unknown speech backend; speech capture disabled");
            None
        }
    }
}

#[cfg(feature = "whisper")]
fn whisper_backend(config: &SpeechConfig) -> Option<DetectedBackend> {
    WhisperChunkBackend::from_env(config).map(|(backend, feed)| DetectedBackend {
        backend: Box::new(backend),
        feed,
    })
}

#[cfg(not(feature = "whisper"))]
fn whisper_backend(_config: &SpeechConfig) -> Option<DetectedBackend> {
    tracing::warn!("whisper feature not enabled; speech capture disabled");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_backend() {
        let config = SpeechConfig::default().with_backend("none");
        assert!(detect_backend(&config).is_none());
    }

    #[test]
    fn test_unknown_backend() {
        let config = SpeechConfig::default().with_backend("carrier-pigeon");
        assert!(detect_backend(&config).is_none());
    }
}
