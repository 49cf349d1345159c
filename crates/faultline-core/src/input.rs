//! Case input buffers and their redacted summary

use crate::error::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Photo attached to a case, already base64-encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Media type, e.g. `image/jpeg`
    pub media_type: String,
    /// Base64 payload
    pub data: String,
}

impl ImageInput {
    /// Wrap an already-encoded payload
    #[must_use]
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes
    #[must_use]
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(
            media_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    /// Load a photo from disk, inferring the media type from its extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let media_type = media_type_for_path(path)?;
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Image(format!("{}: {}", path.display(), e)))?;
        if bytes.is_empty() {
            return Err(Error::Image(format!("{} is empty", path.display())));
        }
        Ok(Self::from_bytes(media_type, &bytes))
    }
}

/// Map a file extension to an image media type
pub fn media_type_for_path(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "webp" => Ok("image/webp"),
        "heic" => Ok("image/heic"),
        "heif" => Ok("image/heif"),
        "gif" => Ok("image/gif"),
        "" => Err(Error::Image(format!(
            "{} has no file extension",
            path.display()
        ))),
        other => Err(Error::Image(format!("unsupported image type: .{}", other))),
    }
}

/// Everything the user has entered for the next submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseInput {
    /// Written description
    pub description: String,
    /// Optional photo
    pub image: Option<ImageInput>,
    /// Voice note transcript
    pub transcript: String,
}

impl CaseInput {
    /// Build from parts
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        image: Option<ImageInput>,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            image,
            transcript: transcript.into(),
        }
    }

    /// True when there is nothing to diagnose.
    ///
    /// Whitespace-only text counts as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.trim().is_empty()
            && self.transcript.trim().is_empty()
            && self.image.is_none()
    }

    /// Redacted summary kept with a history entry
    #[must_use]
    pub fn summary(&self) -> InputSummary {
        InputSummary {
            has_description: !self.description.trim().is_empty(),
            has_image: self.image.is_some(),
            transcript: self.transcript.trim().to_string(),
        }
    }
}

/// What a history entry remembers about its input.
///
/// Image bytes and the description text are never retained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSummary {
    /// A written description was provided
    pub has_description: bool,
    /// A photo was attached
    pub has_image: bool,
    /// Voice note transcript (may be empty)
    pub transcript: String,
}
