//! Payload encoding: raw document bytes ↔ base64 JSON `bytes` fields.
//!
//! The REST surface of the Translation API carries proto `bytes` fields as
//! standard (padded) base64 strings, both in `documentInputConfig.content`
//! and in `documentTranslation.byteStreamOutputs`.

use crate::error::TranslateError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Encode document bytes for the request body.
pub fn encode_content(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    b64
}

/// Decode one translated byte stream from the response body.
pub fn decode_output(b64: &str) -> Result<Vec<u8>, TranslateError> {
    STANDARD
        .decode(b64.trim())
        .map_err(|e| TranslateError::MalformedResponse(format!("byte stream is not base64: {e}")))
}
