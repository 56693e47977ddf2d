//! Result types returned by the translation entry points.

use crate::pipeline::mime::DocumentKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A translated document plus what we learned along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutput {
    /// Translated document bytes. Skipped in JSON output.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// MIME type reported by the API.
    pub mime_type: String,
    /// Extension derived from `mime_type`, without the dot.
    pub extension: String,
    /// Source language the API detected, when no source was given.
    pub detected_language_code: Option<String>,
    /// Model the API used.
    pub model: Option<String>,
    /// MIME type detected for the input.
    pub input_mime_type: String,
    /// Dispatch class of the input.
    pub input_kind: DocumentKind,
    /// Where the result was written, if it was.
    pub written_to: Option<PathBuf>,
    pub stats: TranslationStats,
}

impl TranslationOutput {
    /// Whether the input was an image laid out into a PDF before submission.
    pub fn converted_from_image(&self) -> bool {
        self.input_kind == DocumentKind::Image
    }
}

/// Sizes and timings for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Bytes read from the input.
    pub input_bytes: usize,
    /// Bytes sent to the API (differs from `input_bytes` after image conversion).
    pub submitted_bytes: usize,
    /// Bytes of the translated document.
    pub output_bytes: usize,
    pub convert_duration_ms: u64,
    pub api_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Retries the API call needed.
    pub retries: u32,
}

/// What [`crate::translate::inspect`] learns about an input without translating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputReport {
    pub input: String,
    /// `None` when the type could not be determined.
    pub mime_type: Option<String>,
    /// `None` when the type cannot be translated.
    pub kind: Option<DocumentKind>,
    pub size_bytes: u64,
    /// Pixel dimensions for images the decoder understands.
    pub image_dimensions: Option<(u32, u32)>,
    /// MIME type that would be submitted to the API.
    pub submitted_mime_type: Option<String>,
}
