//! Voice note transcription
//!
//! Feeds a WAV recording through the speech capture adapter and returns the
//! finalized transcript.

use anyhow::{bail, Context, Result};
use faultline_audio::{detect_backend, SpeechCapture, SpeechConfig};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound on waiting for one chunk's transcription
const CHUNK_TIMEOUT: Duration = Duration::from_secs(60);

/// Transcribe a WAV file, printing interim progress to stdout
pub async fn transcribe_file(config: &SpeechConfig, path: &Path) -> Result<String> {
    let Some(detected) = detect_backend(config) else {
        bail!(faultline_audio::Error::CapabilityUnavailable(
            "set OPENAI_API_KEY to enable voice notes".to_string()
        ));
    };
    let feed = detected.feed;
    let mut capture = SpeechCapture::new(Some(detected.backend));

    let chunks = faultline_audio::read_wav_chunks(path, config.chunk_secs)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    capture.start()?;
    info!(chunks = chunks.len(), path = %path.display(), "Transcribing voice note");

    let total = chunks.len();
    let sender = tokio::spawn(async move {
        for chunk in chunks {
            if feed.send(chunk).await.is_err() {
                break;
            }
        }
        // Keep the feed open until the caller stops capture
        feed
    });

    for received in 0..total {
        match tokio::time::timeout(CHUNK_TIMEOUT, capture.next_update()).await {
            Ok(Ok(Some(update))) => {
                println!("  [{}/{}] {}", received + 1, total, update.display_text());
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                sender.abort();
                return Err(e).context("Voice note transcription failed");
            }
            Err(_) => {
                warn!("Timed out waiting for transcription");
                break;
            }
        }
    }

    if capture.is_recording() {
        capture.stop()?;
    }
    sender.abort();
    Ok(capture.finalized().to_string())
}
