//! Translation entry points.
//!
//! One document goes through five steps, each of which returns the first
//! error it hits:
//!
//! 1. resolve the input and detect its MIME type,
//! 2. lay images out on a single PDF page,
//! 3. read the (possibly converted) document,
//! 4. submit it to the translation API,
//! 5. name the result by the MIME type the API reports and write it.
//!
//! [`translate`] stops after step 4 and hands the bytes back;
//! [`translate_to_file`] runs all five; [`translate_batch`] runs several
//! documents concurrently through one shared client.

use crate::auth::Credentials;
use crate::client::{translate_with_retry, DocumentRequest, DocumentTranslator, GoogleTranslationClient};
use crate::config::{OutputNaming, TranslationConfig};
use crate::error::TranslateError;
use crate::output::{InputReport, TranslationOutput, TranslationStats};
use crate::pipeline::mime::{self, DocumentKind, PDF_MIME};
use crate::pipeline::{image_pdf, input, output};
use crate::progress::Stage;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Env var consulted for the project id when none is configured.
pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

const INSPECT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Translate a document and return the translated bytes without writing them.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL of a PDF, image or Office document
/// * `config` — Translation configuration
///
/// # Errors
/// The first failure of any step: unreadable input, unsupported type,
/// undecodable image, missing credentials, or an API error.
pub async fn translate(
    input_str: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let input_str = input_str.as_ref();
    let translator = resolve_translator(config).await?;
    let keep_pdf = config.keep_intermediate_pdf.as_deref();
    let result = translate_one(input_str, &translator, config, keep_pdf).await;
    report(config, input_str, &result);
    result
}

/// Translate a document and write it under `config.output_dir`.
///
/// The file name comes from `config.naming`; the extension from the MIME
/// type of the API response (`outputs/translated_document.pdf` by default).
pub async fn translate_to_file(
    input_str: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let input_str = input_str.as_ref();
    let translator = resolve_translator(config).await?;
    let keep_pdf = config.keep_intermediate_pdf.as_deref();
    let result = translate_and_write(input_str, &translator, config, keep_pdf).await;
    report(config, input_str, &result);
    result
}

/// One entry of a batch result, in input order.
#[derive(Debug)]
pub struct BatchItem {
    pub input: String,
    pub result: Result<TranslationOutput, TranslateError>,
}

/// Translate several documents concurrently and write each one.
///
/// At most `config.concurrency` documents are in flight. A failing document
/// does not stop the others; check each [`BatchItem::result`]. With more than
/// one input, intermediate PDFs are kept as `<keep stem>_<input stem>.pdf`
/// next to `config.keep_intermediate_pdf`.
///
/// # Errors
/// Fails up front if more than one input is given with a fixed output name,
/// if two inputs would produce the same output name, or if no translator can
/// be built.
pub async fn translate_batch<S: AsRef<str>>(
    inputs: &[S],
    config: &TranslationConfig,
) -> Result<Vec<BatchItem>, TranslateError> {
    let inputs: Vec<String> = inputs.iter().map(|s| s.as_ref().to_string()).collect();
    check_batch_naming(&inputs, &config.naming)?;

    let translator = resolve_translator(config).await?;
    let total = inputs.len();
    let keep_pdf_for = |input_str: &str| {
        config.keep_intermediate_pdf.as_deref().map(|keep| {
            if total > 1 {
                intermediate_pdf_path(keep, &input::naming_source(input_str))
            } else {
                keep.to_path_buf()
            }
        })
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }
    info!("Translating {} documents, {} at a time", total, config.concurrency);

    let mut items: Vec<(usize, BatchItem)> = stream::iter(inputs.into_iter().enumerate().map(
        |(idx, input_str)| {
            let translator = Arc::clone(&translator);
            let keep_pdf = keep_pdf_for(&input_str);
            async move {
                let result =
                    translate_and_write(&input_str, &translator, config, keep_pdf.as_deref()).await;
                report(config, &input_str, &result);
                (
                    idx,
                    BatchItem {
                        input: input_str,
                        result,
                    },
                )
            }
        },
    ))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    items.sort_by_key(|(idx, _)| *idx);
    let items: Vec<BatchItem> = items.into_iter().map(|(_, item)| item).collect();

    let ok = items.iter().filter(|i| i.result.is_ok()).count();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, ok);
    }
    info!("Batch complete: {}/{} documents translated", ok, total);
    Ok(items)
}

/// Synchronous wrapper around [`translate_to_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn translate_sync(
    input_str: impl AsRef<str>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(translate_to_file(input_str, config))
}

/// Describe an input without translating it.
///
/// Does not require credentials or network access (except to download URLs).
pub async fn inspect(input_str: impl AsRef<str>) -> Result<InputReport, TranslateError> {
    let input_str = input_str.as_ref();
    let resolved = input::resolve_input(input_str, INSPECT_DOWNLOAD_TIMEOUT_SECS).await?;
    let path = resolved.path();
    let head = input::read_head(path)?;
    let mime_type = mime::detect_mime(path, resolved.content_type(), &head);
    let kind = mime_type.as_deref().and_then(mime::classify);
    let size_bytes = input::file_size(path)?;

    let image_dimensions = if kind == Some(DocumentKind::Image) {
        image::ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .ok()
            .and_then(|r| r.into_dimensions().ok())
    } else {
        None
    };

    let submitted_mime_type = match (kind, &mime_type) {
        (Some(DocumentKind::Image), _) => Some(PDF_MIME.to_string()),
        (Some(_), Some(m)) => Some(mime::essence(m)),
        _ => None,
    };

    Ok(InputReport {
        input: input_str.to_string(),
        mime_type,
        kind,
        size_bytes,
        image_dimensions,
        submitted_mime_type,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Steps 1–4 for one document. Images' PDFs are also written to `keep_pdf`.
async fn translate_one(
    input_str: &str,
    translator: &Arc<dyn DocumentTranslator>,
    config: &TranslationConfig,
    keep_pdf: Option<&Path>,
) -> Result<TranslationOutput, TranslateError> {
    let total_start = Instant::now();
    info!("Starting translation: {}", input_str);

    // ── Step 1: Resolve input and detect type ────────────────────────────
    notify(config, input_str, Stage::Resolve);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let path = resolved.path().to_path_buf();
    let head = input::read_head(&path)?;
    let input_mime = mime::detect_mime(&path, resolved.content_type(), &head);
    let kind = input_mime
        .as_deref()
        .and_then(mime::classify)
        .ok_or_else(|| TranslateError::UnsupportedMimeType {
            path: path.clone(),
            mime: input_mime.clone(),
        })?;
    let input_mime = input_mime.map(|m| mime::essence(&m)).unwrap_or_default();
    debug!("{}: {} ({:?})", input_str, input_mime, kind);

    // ── Steps 2–3: Convert images, read the document ─────────────────────
    let convert_start = Instant::now();
    let (content, submitted_mime, input_bytes) = match kind {
        DocumentKind::Image => {
            notify(config, input_str, Stage::ConvertImage);
            info!("Converting image to PDF: {}", path.display());
            let input_bytes = input::file_size(&path)? as usize;
            let pdf = image_pdf::image_file_to_pdf(&path, config.page_box).await?;
            if let Some(keep) = keep_pdf {
                output::write_output(keep, &pdf).await?;
                info!("Kept intermediate PDF at {}", keep.display());
            }
            (pdf, PDF_MIME.to_string(), input_bytes)
        }
        DocumentKind::Pdf | DocumentKind::Office => {
            let bytes = input::read_document(&path).await?;
            let len = bytes.len();
            (bytes, input_mime.clone(), len)
        }
    };
    let convert_duration_ms = convert_start.elapsed().as_millis() as u64;

    if content.len() > config.max_document_bytes {
        return Err(TranslateError::DocumentTooLarge {
            size: content.len(),
            limit: config.max_document_bytes,
        });
    }

    // ── Step 4: Submit to the translation API ────────────────────────────
    notify(config, input_str, Stage::Translate);
    let request = DocumentRequest {
        content,
        mime_type: submitted_mime,
        target_language_code: config.target_language.clone(),
        source_language_code: config.source_language.clone(),
        model: config.model.clone(),
        native_pdf_only: config.native_pdf_only,
    };
    let submitted_bytes = request.content.len();

    let api_start = Instant::now();
    let (response, retries) = translate_with_retry(
        &**translator,
        &request,
        config.max_retries,
        config.retry_backoff_ms,
    )
    .await?;
    let api_duration_ms = api_start.elapsed().as_millis() as u64;

    let extension = mime::extension_for_mime(&response.mime_type);
    info!(
        "Translated {} → {} bytes ({}) in {}ms",
        input_str,
        response.bytes.len(),
        response.mime_type,
        api_duration_ms
    );

    let stats = TranslationStats {
        input_bytes,
        submitted_bytes,
        output_bytes: response.bytes.len(),
        convert_duration_ms,
        api_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        retries,
    };

    Ok(TranslationOutput {
        bytes: response.bytes,
        mime_type: response.mime_type,
        extension,
        detected_language_code: response.detected_language_code,
        model: response.model,
        input_mime_type: input_mime,
        input_kind: kind,
        written_to: None,
        stats,
    })
}

/// Steps 1–5 for one document.
async fn translate_and_write(
    input_str: &str,
    translator: &Arc<dyn DocumentTranslator>,
    config: &TranslationConfig,
    keep_pdf: Option<&Path>,
) -> Result<TranslationOutput, TranslateError> {
    let write_start = Instant::now();
    let mut out = translate_one(input_str, translator, config, keep_pdf).await?;

    // ── Step 5: Write the result ─────────────────────────────────────────
    notify(config, input_str, Stage::Write);
    let source = input::naming_source(input_str);
    let path = output::output_path(&config.output_dir, &config.naming, &source, &out.extension);
    output::write_output(&path, &out.bytes).await?;
    info!("File translated and saved as {}", path.display());

    out.written_to = Some(path);
    out.stats.total_duration_ms = out
        .stats
        .total_duration_ms
        .max(write_start.elapsed().as_millis() as u64);
    Ok(out)
}

/// Pick the translator, from most-specific to least-specific.
///
/// 1. **Pre-built translator** (`config.translator`) — used as-is; tests and
///    callers with their own middleware go through here.
/// 2. **Google client** — credentials from `config.credentials` or the
///    environment ([`Credentials::from_env`]); project id from
///    `config.project_id`, then `GOOGLE_CLOUD_PROJECT`, then the
///    service-account key.
async fn resolve_translator(
    config: &TranslationConfig,
) -> Result<Arc<dyn DocumentTranslator>, TranslateError> {
    if let Some(ref translator) = config.translator {
        return Ok(Arc::clone(translator));
    }

    let credentials = match config.credentials {
        Some(ref c) => c.clone(),
        None => Credentials::from_env()?,
    };

    let project_id = config
        .project_id
        .clone()
        .filter(|p| !p.trim().is_empty())
        .or_else(|| std::env::var(PROJECT_ENV).ok().filter(|p| !p.trim().is_empty()))
        .or_else(|| credentials.project_id().map(str::to_string))
        .ok_or_else(|| {
            TranslateError::InvalidConfig(format!(
                "no Google Cloud project id; pass --project or set {PROJECT_ENV}"
            ))
        })?;

    debug!(
        "Using {} credentials for project {} ({})",
        credentials.kind(),
        project_id,
        config.location
    );

    let client = GoogleTranslationClient::new(
        credentials,
        config.endpoint.clone(),
        project_id,
        config.location.clone(),
        config.api_timeout_secs,
    )?;
    Ok(Arc::new(client))
}

/// Reject batches whose outputs would overwrite each other.
fn check_batch_naming(inputs: &[String], naming: &OutputNaming) -> Result<(), TranslateError> {
    match naming {
        OutputNaming::Fixed(stem) if inputs.len() > 1 => Err(TranslateError::InvalidConfig(
            format!(
                "{} inputs would all be written as '{}'; name outputs from inputs instead",
                inputs.len(),
                stem
            ),
        )),
        OutputNaming::Fixed(_) => Ok(()),
        OutputNaming::FromInput => {
            // The extension comes from the response, so compare names without it.
            let mut seen: HashMap<PathBuf, &str> = HashMap::new();
            for input_str in inputs {
                let name = output::output_path(
                    Path::new(""),
                    naming,
                    &input::naming_source(input_str),
                    "*",
                );
                if let Some(first) = seen.insert(name.clone(), input_str) {
                    return Err(TranslateError::InvalidConfig(format!(
                        "'{}' and '{}' would both be written as '{}'",
                        first,
                        input_str,
                        name.display()
                    )));
                }
            }
            Ok(())
        }
    }
}

/// `<keep stem>_<input stem>.pdf` beside `keep`, one per batch input.
fn intermediate_pdf_path(keep: &Path, source: &Path) -> PathBuf {
    let keep_stem = keep
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("intermediate");
    let source_stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    keep.with_file_name(format!("{keep_stem}_{source_stem}.pdf"))
}

fn notify(config: &TranslationConfig, input_str: &str, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(input_str, stage);
    }
}

fn report(
    config: &TranslationConfig,
    input_str: &str,
    result: &Result<TranslationOutput, TranslateError>,
) {
    match result {
        Ok(out) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_complete(input_str, out.bytes.len());
            }
        }
        Err(e) => {
            warn!("{}: {}", input_str, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_error(input_str, &e.to_string());
            }
        }
    }
}
