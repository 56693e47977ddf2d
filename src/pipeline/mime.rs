//! MIME dispatch: decide what an input is and what the output is called.
//!
//! Detection follows the file name first (`mime_guess`), the same way a
//! user would read it, then the server's `Content-Type` for downloads, and
//! only sniffs magic bytes (`infer`) when neither says anything useful.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const PDF_MIME: &str = "application/pdf";
pub const DOC_MIME: &str = "application/msword";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPT_MIME: &str = "application/vnd.ms-powerpoint";
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Dispatch class of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Sent as-is.
    Pdf,
    /// Laid out into a single-page PDF first.
    Image,
    /// Word/PowerPoint/Excel; the endpoint translates these natively.
    Office,
}

/// Detect the MIME type of `path`.
///
/// `hint` is a `Content-Type` header, if any; `head` holds the leading bytes
/// of the file for sniffing.
pub fn detect_mime(path: &Path, hint: Option<&str>, head: &[u8]) -> Option<String> {
    if let Some(guess) = mime_guess::from_path(path).first() {
        return Some(guess.essence_str().to_string());
    }
    if let Some(hint) = hint.map(essence) {
        if !hint.is_empty() && hint != "application/octet-stream" {
            return Some(hint);
        }
    }
    infer::get(head).map(|kind| kind.mime_type().to_string())
}

/// Strip parameters and normalise case: `Image/PNG; q=1` → `image/png`.
pub fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Classify a MIME type; `None` means the document cannot be translated.
pub fn classify(mime: &str) -> Option<DocumentKind> {
    let mime = essence(mime);
    if mime.starts_with("image/") {
        return Some(DocumentKind::Image);
    }
    match mime.as_str() {
        PDF_MIME => Some(DocumentKind::Pdf),
        DOC_MIME | DOCX_MIME | PPT_MIME | PPTX_MIME | XLS_MIME | XLSX_MIME => {
            Some(DocumentKind::Office)
        }
        _ => None,
    }
}

/// File extension (without dot) for a response MIME type.
///
/// Formats the endpoint is known to return are mapped explicitly so the
/// result does not depend on `mime_guess`'s table order; anything else takes
/// the first registered extension, then `bin`.
pub fn extension_for_mime(mime: &str) -> String {
    let mime = essence(mime);
    let known = match mime.as_str() {
        PDF_MIME => Some("pdf"),
        DOC_MIME => Some("doc"),
        DOCX_MIME => Some("docx"),
        PPT_MIME => Some("ppt"),
        PPTX_MIME => Some("pptx"),
        XLS_MIME => Some("xls"),
        XLSX_MIME => Some("xlsx"),
        "text/plain" => Some("txt"),
        "text/html" => Some("html"),
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpeg"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }
    mime_guess::get_mime_extensions_str(&mime)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| "bin".to_string())
}
