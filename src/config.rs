//! Configuration types for document translation.
//!
//! All translation behaviour is controlled through [`TranslationConfig`],
//! built via its [`TranslationConfigBuilder`]. One struct holds every knob so
//! a config can be shared across the concurrent batch workers and logged in
//! full (secrets are redacted by the `Debug` impl).

use crate::auth::Credentials;
use crate::client::DocumentTranslator;
use crate::error::TranslateError;
use crate::pipeline::image_pdf::PageBox;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default Translation API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://translation.googleapis.com";

/// Largest document the synchronous `translateDocument` call accepts inline.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// BCP-47-shaped: a 2–3 letter primary tag and optional subtags (`en`, `en-US`, `zh-Hant-TW`).
static LANGUAGE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").unwrap()
});

/// Returns `true` when `code` looks like a language code the API accepts.
pub fn is_valid_language_code(code: &str) -> bool {
    LANGUAGE_CODE.is_match(code)
}

/// Configuration for a document translation.
///
/// Built via [`TranslationConfig::builder()`] or using
/// [`TranslationConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doctranslate::TranslationConfig;
///
/// let config = TranslationConfig::builder()
///     .target_language("fr")
///     .project_id("my-project")
///     .output_dir("translated")
///     .build()
///     .unwrap();
/// assert_eq!(config.target_language, "fr");
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// Target language code. Default: `en-US`.
    pub target_language: String,

    /// Source language code. If None, the API detects it.
    pub source_language: Option<String>,

    /// Google Cloud project id. If None, taken from `GOOGLE_CLOUD_PROJECT`
    /// or the service-account key.
    pub project_id: Option<String>,

    /// API location. Default: `global`.
    pub location: String,

    /// Translation model resource name, e.g.
    /// `projects/p/locations/us-central1/models/general/nmt`. If None, the API default.
    pub model: Option<String>,

    /// Base URL of the Translation API. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Explicit credentials. If None, resolved from the environment.
    pub credentials: Option<Credentials>,

    /// Pre-constructed translator. Takes precedence over every other API setting.
    pub translator: Option<Arc<dyn DocumentTranslator>>,

    /// Only translate PDFs that carry native text (no OCR). Default: false.
    pub native_pdf_only: bool,

    /// Page box used when an image is laid out into a PDF. Default: 612 × 792 pt.
    pub page_box: PageBox,

    /// Keep the PDF generated from an image input at this path.
    pub keep_intermediate_pdf: Option<PathBuf>,

    /// Directory translated documents are written to. Default: `outputs`.
    pub output_dir: PathBuf,

    /// How output files are named. Default: `translated_document.<ext>`.
    pub naming: OutputNaming,

    /// Reject documents above this size before calling the API. Default: 20 MiB.
    pub max_document_bytes: usize,

    /// Retry attempts for transient API failures (429, 5xx, timeouts). Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 1000.
    pub retry_backoff_ms: u64,

    /// Per-request API timeout in seconds. Default: 300.
    ///
    /// Scanned PDFs go through OCR on the service side; a dense 20-page scan
    /// can take well over a minute to come back.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Concurrent documents in [`crate::translate::translate_batch`]. Default: 4.
    pub concurrency: usize,

    /// Stage events for progress reporting.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: "en-US".to_string(),
            source_language: None,
            project_id: None,
            location: "global".to_string(),
            model: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: None,
            translator: None,
            native_pdf_only: false,
            page_box: PageBox::default(),
            keep_intermediate_pdf: None,
            output_dir: PathBuf::from("outputs"),
            naming: OutputNaming::default(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_retries: 0,
            retry_backoff_ms: 1000,
            api_timeout_secs: 300,
            download_timeout_secs: 120,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("target_language", &self.target_language)
            .field("source_language", &self.source_language)
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials.as_ref().map(|c| c.kind()))
            .field(
                "translator",
                &self.translator.as_ref().map(|_| "<dyn DocumentTranslator>"),
            )
            .field("native_pdf_only", &self.native_pdf_only)
            .field("page_box", &self.page_box)
            .field("output_dir", &self.output_dir)
            .field("naming", &self.naming)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TranslationConfig`].
#[derive(Debug)]
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl TranslationConfigBuilder {
    pub fn target_language(mut self, code: impl Into<String>) -> Self {
        self.config.target_language = code.into();
        self
    }

    pub fn source_language(mut self, code: impl Into<String>) -> Self {
        self.config.source_language = Some(code.into());
        self
    }

    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.config.project_id = Some(id.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config.location = location.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn translator(mut self, translator: Arc<dyn DocumentTranslator>) -> Self {
        self.config.translator = Some(translator);
        self
    }

    pub fn native_pdf_only(mut self, v: bool) -> Self {
        self.config.native_pdf_only = v;
        self
    }

    pub fn page_box(mut self, page_box: PageBox) -> Self {
        self.config.page_box = page_box;
        self
    }

    pub fn keep_intermediate_pdf(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.keep_intermediate_pdf = Some(path.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn naming(mut self, naming: OutputNaming) -> Self {
        self.config.naming = naming;
        self
    }

    pub fn max_document_bytes(mut self, n: usize) -> Self {
        self.config.max_document_bytes = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(10);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslateError> {
        let c = &self.config;
        if !is_valid_language_code(&c.target_language) {
            return Err(TranslateError::InvalidConfig(format!(
                "target language '{}' is not a language code (e.g. en-US, fr, ja)",
                c.target_language
            )));
        }
        if let Some(ref src) = c.source_language {
            if !is_valid_language_code(src) {
                return Err(TranslateError::InvalidConfig(format!(
                    "source language '{}' is not a language code",
                    src
                )));
            }
        }
        if c.location.trim().is_empty() {
            return Err(TranslateError::InvalidConfig(
                "location must not be empty".into(),
            ));
        }
        if !c.endpoint.starts_with("http://") && !c.endpoint.starts_with("https://") {
            return Err(TranslateError::InvalidConfig(format!(
                "endpoint '{}' must be an http(s) URL",
                c.endpoint
            )));
        }
        if !(c.page_box.width_pt > 0.0 && c.page_box.height_pt > 0.0) {
            return Err(TranslateError::InvalidConfig(format!(
                "page box must be positive, got {}×{} pt",
                c.page_box.width_pt, c.page_box.height_pt
            )));
        }
        if let OutputNaming::Fixed(ref stem) = c.naming {
            if stem.is_empty() || stem.contains(['/', '\\']) {
                return Err(TranslateError::InvalidConfig(format!(
                    "output name '{}' must be a plain file stem",
                    stem
                )));
            }
        }
        if c.max_document_bytes == 0 {
            return Err(TranslateError::InvalidConfig(
                "max document size must be > 0".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the translated file is named inside [`TranslationConfig::output_dir`].
///
/// The extension always comes from the MIME type of the API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputNaming {
    /// Fixed stem for every document. Default: `translated_document`.
    Fixed(String),
    /// `<input-stem>_translated`, required when translating several documents.
    FromInput,
}

impl Default for OutputNaming {
    fn default() -> Self {
        OutputNaming::Fixed("translated_document".to_string())
    }
}
