//! Remote document translation.
//!
//! [`DocumentTranslator`] is the seam between the pipeline and the network:
//! the pipeline builds a [`DocumentRequest`], hands it to whatever translator
//! the config carries, and gets a [`DocumentResponse`] back. Production code
//! uses [`GoogleTranslationClient`]; tests inject a fake.
//!
//! ## Wire format
//!
//! `POST {endpoint}/v3/projects/{project}/locations/{location}:translateDocument`
//! with a camelCase JSON body. Document bytes travel base64-encoded in
//! `documentInputConfig.content` and come back the same way in
//! `documentTranslation.byteStreamOutputs`. Only the first output stream is
//! used; single-document requests never produce more than one.

use crate::auth::{Credentials, TokenSource};
use crate::error::TranslateError;
use crate::pipeline::encode::{decode_output, encode_content};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// A document ready to be translated.
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    /// Raw document bytes (PDF after image conversion).
    pub content: Vec<u8>,
    /// MIME type of `content`.
    pub mime_type: String,
    pub target_language_code: String,
    pub source_language_code: Option<String>,
    pub model: Option<String>,
    /// Skip OCR; only native-text PDFs are translated.
    pub native_pdf_only: bool,
}

/// The translated document returned by the endpoint.
#[derive(Debug, Clone)]
pub struct DocumentResponse {
    pub bytes: Vec<u8>,
    /// MIME type reported by the API; drives the output file extension.
    pub mime_type: String,
    pub detected_language_code: Option<String>,
    pub model: Option<String>,
}

/// Anything that can translate a whole document.
#[async_trait]
pub trait DocumentTranslator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Translate one document.
    async fn translate_document(
        &self,
        request: &DocumentRequest,
    ) -> Result<DocumentResponse, TranslateError>;
}

/// Client for the Cloud Translation v3 `translateDocument` method.
pub struct GoogleTranslationClient {
    http: reqwest::Client,
    tokens: TokenSource,
    endpoint: String,
    project_id: String,
    location: String,
    /// Billing project header; only user access tokens need one.
    user_project: Option<String>,
    timeout_secs: u64,
}

impl GoogleTranslationClient {
    pub fn new(
        credentials: Credentials,
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        location: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TranslateError::Internal(format!("HTTP client: {e}")))?;
        let project_id = project_id.into();
        let user_project = match credentials {
            Credentials::AccessToken(_) => Some(project_id.clone()),
            Credentials::ServiceAccount(_) => None,
        };
        Ok(Self {
            tokens: TokenSource::new(credentials, http.clone()),
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            user_project,
            project_id,
            location: location.into(),
            timeout_secs,
        })
    }

    /// `projects/{project}/locations/{location}`.
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }

    /// Full URL of the `translateDocument` method.
    pub fn url(&self) -> String {
        format!("{}/v3/{}:translateDocument", self.endpoint, self.parent())
    }
}

#[async_trait]
impl DocumentTranslator for GoogleTranslationClient {
    fn name(&self) -> &str {
        "google-cloud-translation-v3"
    }

    async fn translate_document(
        &self,
        request: &DocumentRequest,
    ) -> Result<DocumentResponse, TranslateError> {
        let token = self.tokens.access_token().await?;
        let body = TranslateDocumentBody::from_request(request);
        let url = self.url();
        info!(
            "Submitting {} bytes ({}) → {}",
            request.content.len(),
            request.mime_type,
            request.target_language_code
        );

        let mut builder = self.http.post(&url).bearer_auth(&token);
        if let Some(ref project) = self.user_project {
            builder = builder.header("x-goog-user-project", project);
        }
        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslateError::ApiTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    TranslateError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &text, retry_after_secs));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TranslateError::ApiTimeout {
                    secs: self.timeout_secs,
                }
            } else {
                TranslateError::Transport(e.to_string())
            }
        })?;
        parse_response(&text)
    }
}

/// Call `translator`, retrying transient failures with exponential backoff.
///
/// Returns the response and the number of retries that were needed.
pub async fn translate_with_retry(
    translator: &dyn DocumentTranslator,
    request: &DocumentRequest,
    max_retries: u32,
    backoff_ms: u64,
) -> Result<(DocumentResponse, u32), TranslateError> {
    let mut attempt = 0u32;
    loop {
        match translator.translate_document(request).await {
            Ok(response) => return Ok((response, attempt)),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                let delay = match &e {
                    TranslateError::RateLimitExceeded {
                        retry_after_secs: Some(secs),
                    } => secs.saturating_mul(1000),
                    _ => backoff_ms.saturating_mul(2u64.saturating_pow(attempt - 1)),
                };
                warn!(
                    "{}: attempt {} failed — {}; retry {}/{} after {}ms",
                    translator.name(),
                    attempt,
                    e,
                    attempt,
                    max_retries,
                    delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateDocumentBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_language_code: Option<&'a str>,
    target_language_code: &'a str,
    document_input_config: DocumentInputConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_translate_native_pdf_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentInputConfig<'a> {
    content: String,
    mime_type: &'a str,
}

impl<'a> TranslateDocumentBody<'a> {
    fn from_request(request: &'a DocumentRequest) -> Self {
        Self {
            source_language_code: request.source_language_code.as_deref(),
            target_language_code: &request.target_language_code,
            document_input_config: DocumentInputConfig {
                content: encode_content(&request.content),
                mime_type: &request.mime_type,
            },
            model: request.model.as_deref(),
            is_translate_native_pdf_only: request.native_pdf_only,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateDocumentResponse {
    document_translation: Option<DocumentTranslation>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentTranslation {
    #[serde(default)]
    byte_stream_outputs: Vec<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    detected_language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn parse_response(text: &str) -> Result<DocumentResponse, TranslateError> {
    let parsed: TranslateDocumentResponse =
        serde_json::from_str(text).map_err(|e| TranslateError::MalformedResponse(e.to_string()))?;
    let translation = parsed
        .document_translation
        .ok_or(TranslateError::EmptyResponse)?;
    let first = translation
        .byte_stream_outputs
        .into_iter()
        .next()
        .ok_or(TranslateError::EmptyResponse)?;
    let bytes = decode_output(&first)?;
    let mime_type = translation.mime_type.filter(|m| !m.is_empty()).ok_or_else(|| {
        TranslateError::MalformedResponse("documentTranslation.mimeType is missing".into())
    })?;
    debug!("Received {} bytes ({})", bytes.len(), mime_type);

    Ok(DocumentResponse {
        bytes,
        mime_type,
        detected_language_code: translation.detected_language_code,
        model: parsed.model,
    })
}

fn map_status(status: u16, body: &str, retry_after_secs: Option<u64>) -> TranslateError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    match status {
        401 | 403 => TranslateError::AuthError { detail: message },
        429 => TranslateError::RateLimitExceeded { retry_after_secs },
        _ => TranslateError::ApiError { status, message },
    }
}
