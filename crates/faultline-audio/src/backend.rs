//! Recognition backend abstraction
//!
//! A backend runs a continuous recognition stream and reports results through
//! an event channel. It never touches transcript state; that belongs to
//! [`crate::SpeechCapture`].

use crate::error::Result;
use tokio::sync::mpsc;

/// One recognised span of speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    /// Recognised text
    pub text: String,
    /// Finalized; interim segments may still change
    pub is_final: bool,
}

impl TranscriptSegment {
    /// A finalized segment
    #[must_use]
    pub fn finalized(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    /// An interim segment
    #[must_use]
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// Events emitted by a running backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// New results; interim segments replace the previous interim text
    Result(Vec<TranscriptSegment>),
    /// The stream failed
    Error(String),
    /// The stream ended on its own
    End,
}

/// Channel a backend reports into
pub type EventSender = mpsc::UnboundedSender<RecognitionEvent>;

/// Raw mono audio pushed into a backend
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Sending half used to push audio into a backend
pub type AudioFeed = mpsc::Sender<AudioChunk>;

/// A continuous speech recognition stream
#[cfg_attr(test, mockall::automock)]
pub trait RecognitionBackend: Send {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Begin (or resume) recognition, reporting into `events`
    fn start(&mut self, events: EventSender) -> Result<()>;

    /// Stop recognition; pending results may be discarded
    fn stop(&mut self);
}
