//! # edgequake-doctranslate
//!
//! Translate PDF, image and Office documents with the Google Cloud
//! Translation v3 `translateDocument` API.
//!
//! ## Why this crate?
//!
//! The document-translation endpoint keeps layout intact, but it only
//! accepts PDF and Office formats. Scans and photos arrive as PNG or JPEG.
//! This crate lays an image out on a single US-Letter PDF page first, so
//! anything a user points it at can go through the same call, and it names
//! the result by the MIME type the API hands back.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Detect    MIME from extension, Content-Type, or magic bytes
//!  ├─ 3. Convert   image → one-page PDF (CPU-bound, spawn_blocking)
//!  ├─ 4. Translate base64 → translateDocument → base64
//!  └─ 5. Output    outputs/translated_document.<ext from response MIME>
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doctranslate::{translate_to_file, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_OAUTH_ACCESS_TOKEN,
//!     // project from GOOGLE_CLOUD_PROJECT or the service-account key.
//!     let config = TranslationConfig::builder().target_language("fr").build()?;
//!     let output = translate_to_file("inputs/scan.png", &config).await?;
//!     eprintln!("wrote {:?} ({})", output.written_to, output.mime_type);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doctranslate` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-doctranslate = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod translate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use auth::Credentials;
pub use client::{DocumentRequest, DocumentResponse, DocumentTranslator, GoogleTranslationClient};
pub use config::{OutputNaming, TranslationConfig, TranslationConfigBuilder};
pub use error::TranslateError;
pub use output::{InputReport, TranslationOutput, TranslationStats};
pub use pipeline::image_pdf::PageBox;
pub use pipeline::mime::DocumentKind;
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, TranslationProgressCallback};
pub use translate::{inspect, translate, translate_batch, translate_sync, translate_to_file, BatchItem};
