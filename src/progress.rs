//! Progress-callback trait for per-stage translation events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to be told
//! when each document enters a pipeline stage and when it finishes.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doctranslate::{Stage, TranslationConfig, TranslationProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl TranslationProgressCallback for Printer {
//!     fn on_stage(&self, input: &str, stage: Stage) {
//!         eprintln!("{input}: {}", stage.label());
//!     }
//! }
//!
//! let config = TranslationConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pipeline stage a document is entering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Locating or downloading the input and detecting its type.
    Resolve,
    /// Laying an image out on a PDF page.
    ConvertImage,
    /// Waiting on the translation API.
    Translate,
    /// Writing the translated document.
    Write,
}

impl Stage {
    /// Human-readable label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Resolve => "reading input",
            Stage::ConvertImage => "converting image to PDF",
            Stage::Translate => "translating",
            Stage::Write => "writing output",
        }
    }
}

/// Called by the pipeline as each document moves through its stages.
///
/// Implementations must be `Send + Sync`: batch translation runs several
/// documents concurrently. All methods default to no-ops.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called when a batch starts, with the number of documents.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when `input` enters `stage`.
    fn on_stage(&self, input: &str, stage: Stage) {
        let _ = (input, stage);
    }

    /// Called when `input` has been translated; `output_bytes` is the size of the result.
    fn on_document_complete(&self, input: &str, output_bytes: usize) {
        let _ = (input, output_bytes);
    }

    /// Called when `input` failed.
    fn on_document_error(&self, input: &str, error: &str) {
        let _ = (input, error);
    }

    /// Called once after every document in a batch has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;
