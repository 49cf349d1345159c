//! Speech capture adapter
//!
//! Wraps an optional [`RecognitionBackend`], keeps finalized and interim
//! transcript text apart, and restarts the backend when its stream ends while
//! recording is still on.

use crate::backend::{EventSender, RecognitionBackend, RecognitionEvent};
use crate::error::{Error, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Snapshot of the transcript after an update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptUpdate {
    /// Text that will not change
    pub finalized: String,
    /// Text still being recognised
    pub interim: String,
}

impl TranscriptUpdate {
    /// Finalized and interim text joined for display
    #[must_use]
    pub fn display_text(&self) -> String {
        join(&self.finalized, &self.interim)
    }
}

fn join(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

/// Speech capture state machine
pub struct SpeechCapture {
    backend: Option<Box<dyn RecognitionBackend>>,
    recording: bool,
    finalized: String,
    interim: String,
    restarts: u32,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<RecognitionEvent>,
}

impl SpeechCapture {
    /// Create an adapter; `None` means speech capture is unavailable
    #[must_use]
    pub fn new(backend: Option<Box<dyn RecognitionBackend>>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        match &backend {
            Some(b) => info!(backend = b.name(), "Speech capture available"),
            None => info!("Speech capture unavailable; recording disabled"),
        }
        Self {
            backend,
            recording: false,
            finalized: String::new(),
            interim: String::new(),
            restarts: 0,
            events_tx,
            events_rx,
        }
    }

    /// Whether a backend is present
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Whether recording is toggled on
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Finalized text so far
    #[must_use]
    pub fn finalized(&self) -> &str {
        &self.finalized
    }

    /// Current interim text
    #[must_use]
    pub fn interim(&self) -> &str {
        &self.interim
    }

    /// Finalized and interim text joined
    #[must_use]
    pub fn transcript(&self) -> String {
        join(&self.finalized, &self.interim)
    }

    /// Times the backend was restarted after ending on its own
    #[must_use]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Discard all transcript text
    pub fn clear_transcript(&mut self) {
        self.finalized.clear();
        self.interim.clear();
    }

    fn snapshot(&self) -> TranscriptUpdate {
        TranscriptUpdate {
            finalized: self.finalized.clone(),
            interim: self.interim.clone(),
        }
    }

    /// Begin recording. Idempotent while already recording.
    pub fn start(&mut self) -> Result<()> {
        if self.recording {
            return Ok(());
        }
        let backend = self.backend.as_mut().ok_or_else(|| {
            Error::CapabilityUnavailable("no speech recognition backend".to_string())
        })?;

        // Events left over from a previous run must not leak into this one
        while self.events_rx.try_recv().is_ok() {}

        backend.start(self.events_tx.clone())?;
        self.recording = true;
        self.interim.clear();
        debug!(backend = backend.name(), "Recording started");
        Ok(())
    }

    /// Stop recording, discarding interim text only
    pub fn stop(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::NotRecording);
        }
        if let Some(backend) = self.backend.as_mut() {
            backend.stop();
        }
        self.recording = false;
        self.interim.clear();
        debug!(chars = self.finalized.len(), "Recording stopped");
        Ok(())
    }

    /// Flip recording on or off; returns the new recording state
    pub fn toggle(&mut self) -> Result<bool> {
        if self.recording {
            self.stop()?;
        } else {
            self.start()?;
        }
        Ok(self.recording)
    }

    /// Apply one backend event.
    ///
    /// Returns `Ok(None)` for events that arrive while not recording. A
    /// backend error stops recording and surfaces as [`Error::Recognition`];
    /// finalized text is kept.
    pub fn handle_event(&mut self, event: RecognitionEvent) -> Result<Option<TranscriptUpdate>> {
        if !self.recording {
            debug!(?event, "Ignoring recognition event while stopped");
            return Ok(None);
        }

        match event {
            RecognitionEvent::Result(segments) => {
                let mut interim = String::new();
                for segment in segments {
                    let text = segment.text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if segment.is_final {
                        self.finalized = join(&self.finalized, text);
                    } else {
                        interim = join(&interim, text);
                    }
                }
                self.interim = interim;
                Ok(Some(self.snapshot()))
            }
            RecognitionEvent::End => {
                // Interim text from the ended stream will never finalize
                self.interim.clear();
                let Some(backend) = self.backend.as_mut() else {
                    self.recording = false;
                    return Ok(Some(self.snapshot()));
                };
                if let Err(e) = backend.start(self.events_tx.clone()) {
                    warn!(error = %e, "Recognition restart failed");
                    self.recording = false;
                    return Err(Error::Recognition(e.to_string()));
                }
                self.restarts += 1;
                debug!(restarts = self.restarts, "Recognition restarted");
                Ok(Some(self.snapshot()))
            }
            RecognitionEvent::Error(reason) => {
                warn!(reason = %reason, "Recognition failed; recording stopped");
                if let Some(backend) = self.backend.as_mut() {
                    backend.stop();
                }
                self.recording = false;
                self.interim.clear();
                Err(Error::Recognition(reason))
            }
        }
    }

    /// Wait for the next transcript change.
    ///
    /// Returns `Ok(None)` immediately when not recording.
    pub async fn next_update(&mut self) -> Result<Option<TranscriptUpdate>> {
        while self.recording {
            let Some(event) = self.events_rx.recv().await else {
                return Ok(None);
            };
            if let Some(update) = self.handle_event(event)? {
                return Ok(Some(update));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockRecognitionBackend, TranscriptSegment};
    use std::sync::{Arc, Mutex};

    fn mock_backend(starts: usize) -> MockRecognitionBackend {
        let mut backend = MockRecognitionBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_start().times(starts).returning(|_| Ok(()));
        backend.expect_stop().return_const(());
        backend
    }

    fn result(segments: Vec<TranscriptSegment>) -> RecognitionEvent {
        RecognitionEvent::Result(segments)
    }

    #[test]
    fn test_unavailable_backend() {
        let mut capture = SpeechCapture::new(None);
        assert!(!capture.is_available());
        assert!(matches!(capture.start(), Err(Error::CapabilityUnavailable(_))));
        assert!(!capture.is_recording());
    }

    #[test]
    fn test_final_and_interim_segments() {
        let mut capture = SpeechCapture::new(Some(Box::new(mock_backend(1))));
        capture.start().unwrap();

        let update = capture
            .handle_event(result(vec![TranscriptSegment::interim("the dryer")]))
            .unwrap()
            .unwrap();
        assert_eq!(update.finalized, "");
        assert_eq!(update.interim, "the dryer");

        let update = capture
            .handle_event(result(vec![
                TranscriptSegment::finalized("the dryer squeals"),
                TranscriptSegment::interim("when it"),
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(update.finalized, "the dryer squeals");
        assert_eq!(update.interim, "when it");
        assert_eq!(capture.transcript(), "the dryer squeals when it");
    }

    #[test]
    fn test_stop_discards_interim_only() {
        let mut capture = SpeechCapture::new(Some(Box::new(mock_backend(1))));
        capture.start().unwrap();
        capture
            .handle_event(result(vec![
                TranscriptSegment::finalized("kept"),
                TranscriptSegment::interim("dropped"),
            ]))
            .unwrap();

        capture.stop().unwrap();
        assert_eq!(capture.transcript(), "kept");
        assert!(matches!(capture.stop(), Err(Error::NotRecording)));

        // Late events after stop are ignored
        let late = capture
            .handle_event(result(vec![TranscriptSegment::finalized("late")]))
            .unwrap();
        assert!(late.is_none());
        assert_eq!(capture.finalized(), "kept");
    }

    #[test]
    fn test_end_while_recording_restarts_without_duplication() {
        let mut capture = SpeechCapture::new(Some(Box::new(mock_backend(2))));
        capture.start().unwrap();
        capture
            .handle_event(result(vec![
                TranscriptSegment::finalized("hello"),
                TranscriptSegment::interim("wor"),
            ]))
            .unwrap();

        let update = capture.handle_event(RecognitionEvent::End).unwrap().unwrap();
        assert_eq!(update.finalized, "hello");
        assert_eq!(update.interim, "");
        assert!(capture.is_recording());
        assert_eq!(capture.restarts(), 1);

        capture
            .handle_event(result(vec![TranscriptSegment::interim("world")]))
            .unwrap();
        assert_eq!(capture.transcript(), "hello world");
        capture
            .handle_event(result(vec![TranscriptSegment::finalized("world")]))
            .unwrap();
        assert_eq!(capture.transcript(), "hello world");
    }

    #[test]
    fn test_error_stops_and_keeps_finalized() {
        let mut capture = SpeechCapture::new(Some(Box::new(mock_backend(1))));
        capture.start().unwrap();
        capture
            .handle_event(result(vec![
                TranscriptSegment::finalized("water on floor"),
                TranscriptSegment::interim("under"),
            ]))
            .unwrap();

        let err = capture
            .handle_event(RecognitionEvent::Error("network".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Recognition(reason) if reason == "network"));
        assert!(!capture.is_recording());
        assert_eq!(capture.transcript(), "water on floor");
    }

    #[test]
    fn test_restart_failure_stops_recording() {
        let mut backend = MockRecognitionBackend::new();
        backend.expect_name().return_const("mock");
        let mut calls = 0;
        backend.expect_start().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(Error::AudioStream("device gone".to_string()))
            }
        });
        backend.expect_stop().return_const(());

        let mut capture = SpeechCapture::new(Some(Box::new(backend)));
        capture.start().unwrap();
        let err = capture.handle_event(RecognitionEvent::End).unwrap_err();
        assert!(matches!(err, Error::Recognition(_)));
        assert!(!capture.is_recording());
    }

    #[tokio::test]
    async fn test_next_update_reads_backend_events() {
        let sender: Arc<Mutex<Option<EventSender>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&sender);

        let mut backend = MockRecognitionBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_start().times(1).returning(move |tx| {
            *slot.lock().unwrap() = Some(tx);
            Ok(())
        });
        backend.expect_stop().return_const(());

        let mut capture = SpeechCapture::new(Some(Box::new(backend)));
        capture.start().unwrap();

        let tx = sender.lock().unwrap().clone().unwrap();
        tx.send(result(vec![TranscriptSegment::finalized("it rattles")]))
            .unwrap();

        let update = capture.next_update().await.unwrap().unwrap();
        assert_eq!(update.display_text(), "it rattles");

        assert!(capture.toggle().is_ok());
        assert!(!capture.is_recording());
        assert!(capture.next_update().await.unwrap().is_none());
    }
}
