//! Error types for the edgequake-doctranslate library.
//!
//! The pipeline is linear, so there is a single fatal error type:
//! [`TranslateError`]. The first failing stage returns it and nothing
//! downstream runs. Variants are grouped by the stage that produces them so
//! the CLI can print an actionable hint next to each one.
//!
//! [`TranslateError::is_retryable`] is the only policy decision made here:
//! it decides which API failures the optional retry loop may repeat.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-doctranslate library.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input path exists but is a directory or other non-regular file.
    #[error("Input '{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The MIME type could not be determined or is not a translatable document.
    #[error(
        "Unsupported input type for '{path}': {}\n\
Supported: PDF, images (PNG, JPEG, …), DOC/DOCX, PPT/PPTX, XLS/XLSX.",
        .mime.as_deref().unwrap_or("unknown MIME type")
    )]
    UnsupportedMimeType { path: PathBuf, mime: Option<String> },

    /// The document is larger than the inline-content limit of the endpoint.
    #[error("Document is {size} bytes; the inline limit is {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The image could not be decoded.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    /// printpdf could not produce the single-page PDF.
    #[error("Failed to build PDF from image: {0}")]
    PdfBuildFailed(String),

    // ── Auth errors ───────────────────────────────────────────────────────
    /// No usable credentials were found.
    #[error("Google Cloud credentials are not configured.\n{hint}")]
    CredentialsNotConfigured { hint: String },

    /// The service-account key file could not be read or parsed.
    #[error("Invalid service-account key '{path}': {detail}")]
    InvalidCredentials { path: PathBuf, detail: String },

    /// The OAuth token exchange failed.
    #[error("Failed to obtain an access token: {0}")]
    TokenExchangeFailed(String),

    // ── API errors ────────────────────────────────────────────────────────
    /// The API rejected the credentials (401/403) — retry will not help.
    #[error("Authentication error from the translation API: {detail}")]
    AuthError { detail: String },

    /// The API returned HTTP 429 — caller should back off.
    #[error("Rate limit exceeded by the translation API")]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    /// The API call timed out.
    #[error("Translation API call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The API returned a non-success status.
    #[error("Translation API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request could not be sent at all (DNS, TLS, connection reset).
    #[error("Failed to reach the translation API: {0}")]
    Transport(String),

    /// The API answered 200 but the body is not what we expect.
    #[error("Malformed response from the translation API: {0}")]
    MalformedResponse(String),

    /// The API answered without any translated byte stream.
    #[error("Translation API returned no document output")]
    EmptyResponse,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranslateError {
    /// Whether the optional retry loop may repeat the call that produced this error.
    ///
    /// Only rate limiting, timeouts, transport failures and 5xx responses
    /// qualify. Everything else fails the same way on the next attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslateError::RateLimitExceeded { .. }
            | TranslateError::ApiTimeout { .. }
            | TranslateError::Transport(_) => true,
            TranslateError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
