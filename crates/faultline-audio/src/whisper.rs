//! Whisper API chunk backend
//!
//! Transcribes caller-supplied audio chunks through the OpenAI Whisper API.
//! Each chunk becomes one finalized segment. Requires `OPENAI_API_KEY`.

use crate::backend::{
    AudioChunk, AudioFeed, EventSender, RecognitionBackend, RecognitionEvent, TranscriptSegment,
};
use crate::config::SpeechConfig;
use crate::error::{Error, Result};
use async_openai::{
    config::OpenAIConfig,
    types::audio::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs},
    Client,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const FEED_CAPACITY: usize = 16;

/// Recognition backend that sends audio chunks to Whisper
pub struct WhisperChunkBackend {
    client: Client<OpenAIConfig>,
    language: String,
    model: String,
    chunks: Arc<Mutex<mpsc::Receiver<AudioChunk>>>,
    cancel: Option<CancellationToken>,
}

impl WhisperChunkBackend {
    /// Create a backend and the feed used to push audio into it.
    ///
    /// Returns `None` when `OPENAI_API_KEY` is not set.
    #[must_use]
    pub fn from_env(config: &SpeechConfig) -> Option<(Self, AudioFeed)> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            warn!("OPENAI_API_KEY not set - Whisper speech capture disabled");
            return None;
        }
        Some(Self::with_client(Client::new(), config))
    }

    /// Create with an explicit client
    #[must_use]
    pub fn with_client(client: Client<OpenAIConfig>, config: &SpeechConfig) -> (Self, AudioFeed) {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let backend = Self {
            client,
            language: config.language.clone(),
            model: config.model.clone(),
            chunks: Arc::new(Mutex::new(rx)),
            cancel: None,
        };
        (backend, tx)
    }
}

impl RecognitionBackend for WhisperChunkBackend {
    fn name(&self) -> &'static str {
        "whisper"
    }

    fn start(&mut self, events: EventSender) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::AudioStream(format!("no async runtime: {}", e)))?;

        if let Some(old) = self.cancel.take() {
            old.cancel();
        }
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        let client = self.client.clone();
        let language = self.language.clone();
        let model = self.model.clone();
        let chunks = Arc::clone(&self.chunks);

        runtime.spawn(async move {
            let mut chunks = chunks.lock().await;
            loop {
                let chunk = tokio::select! {
                    _ = cancel.cancelled() => return,
                    chunk = chunks.recv() => chunk,
                };
                let Some(chunk) = chunk else {
                    let _ = events.send(RecognitionEvent::Error("audio feed closed".to_string()));
                    return;
                };

                // One event per chunk, empty for silence
                let event = match transcribe_chunk(&client, &model, &language, &chunk).await {
                    Ok(text) if text.is_empty() => RecognitionEvent::Result(Vec::new()),
                    Ok(text) => RecognitionEvent::Result(vec![TranscriptSegment::finalized(text)]),
                    Err(e) => RecognitionEvent::Error(e.to_string()),
                };
                if cancel.is_cancelled() {
                    return;
                }
                let failed = matches!(event, RecognitionEvent::Error(_));
                if events.send(event).is_err() || failed {
                    return;
                }
            }
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

async fn transcribe_chunk(
    client: &Client<OpenAIConfig>,
    model: &str,
    language: &str,
    chunk: &AudioChunk,
) -> Result<String> {
    let wav = samples_to_wav(&chunk.samples, chunk.sample_rate)?;
    debug!("Transcribing {} bytes via API", wav.len());

    let request = CreateTranscriptionRequestArgs::default()
        .file(AudioInput::from_vec_u8("chunk.wav".to_string(), wav))
        .model(model)
        .language(language)
        .response_format(AudioResponseFormat::Text)
        .build()
        .map_err(|e| Error::Stt(format!("Failed to build request: {e}")))?;

    let response = client
        .audio()
        .transcription()
        .create(request)
        .await
        .map_err(|e| Error::Stt(format!("Transcription failed: {e}")))?;

    Ok(response.text.trim().to_string())
}

/// Convert mono samples to 16-bit PCM WAV bytes
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::AudioStream(format!("Failed to create WAV writer: {}", e)))?;

        for &sample in samples {
            let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(amplitude)
                .map_err(|e| Error::AudioStream(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| Error::AudioStream(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

/// Read a WAV file and split it into mono chunks of `chunk_secs` seconds
pub fn read_wav_chunks(path: impl AsRef<Path>, chunk_secs: u32) -> Result<Vec<AudioChunk>> {
    let mut reader = hound::WavReader::open(path.as_ref())
        .map_err(|e| Error::AudioStream(format!("Failed to open WAV: {}", e)))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::AudioStream(format!("Failed to read samples: {}", e)))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::AudioStream(format!("Failed to read samples: {}", e)))?
        }
    };

    // Downmix by averaging channels
    let mono: Vec<f32> = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    let per_chunk = (spec.sample_rate as usize * chunk_secs.max(1) as usize).max(1);
    Ok(mono
        .chunks(per_chunk)
        .map(|c| AudioChunk {
            samples: c.to_vec(),
            sample_rate: spec.sample_rate,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_to_wav() {
        let samples = vec![0.0f32; 1600];
        let wav = samples_to_wav(&samples, 16000).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 1600 * 2);
    }

    #[test]
    fn test_read_wav_chunks_downmixes_and_splits() {
        let path = std::env::temp_dir().join(format!("faultline-{}.wav", std::process::id()));
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        {
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            // 2.5 seconds of stereo frames
            for _ in 0..20000 {
                writer.write_sample(i16::MAX / 2).unwrap();
                writer.write_sample(i16::MAX / 2).unwrap();
            }
            writer.finalize().unwrap();
        }

        let chunks = read_wav_chunks(&path, 1).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].samples.len(), 8000);
        assert_eq!(chunks[2].samples.len(), 4000);
        assert_eq!(chunks[0].sample_rate, 8000);
        assert!((chunks[0].samples[0] - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_read_wav_missing_file() {
        assert!(matches!(
            read_wav_chunks("/nonexistent/voice.wav", 10),
            Err(Error::AudioStream(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_feed_reports_error() {
        let (mut backend, feed) =
            WhisperChunkBackend::with_client(Client::new(), &SpeechConfig::default());
        drop(feed);

        let (tx, mut rx) = mpsc::unbounded_channel();
        backend.start(tx).unwrap();
        assert!(matches!(rx.recv().await, Some(RecognitionEvent::Error(_))));
        backend.stop();
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let (mut backend, _feed) =
            WhisperChunkBackend::with_client(Client::new(), &SpeechConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(backend.start(tx), Err(Error::AudioStream(_))));
    }
}
