//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! URL inputs are downloaded into a `TempDir` that lives as long as the
//! returned [`ResolvedInput`], so the file disappears once the document has
//! been translated, even on early return. The download keeps the URL's file
//! name when it has one so MIME detection by extension still works.

use crate::error::TranslateError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Bytes read up front for magic-number sniffing.
const HEAD_LEN: usize = 64;

/// The resolved input — either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; document downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded {
        path: PathBuf,
        content_type: Option<String>,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    /// Get the path to the document regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// `Content-Type` reported by the server for downloaded inputs.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            ResolvedInput::Local(_) => None,
            ResolvedInput::Downloaded { content_type, .. } => content_type.as_deref(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(
    input: &str,
    timeout_secs: u64,
) -> Result<ResolvedInput, TranslateError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and readability.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, TranslateError> {
    let path = PathBuf::from(path_str);

    let meta = std::fs::metadata(&path).map_err(|e| io_to_input_error(e, &path))?;
    if !meta.is_file() {
        return Err(TranslateError::NotAFile { path });
    }
    // Opening proves read permission; metadata alone does not.
    std::fs::File::open(&path).map_err(|e| io_to_input_error(e, &path))?;

    debug!("Resolved local input: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Read the whole document.
pub async fn read_document(path: &Path) -> Result<Vec<u8>, TranslateError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| io_to_input_error(e, path))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Read up to the first few bytes of a file for MIME sniffing.
pub fn read_head(path: &Path) -> Result<Vec<u8>, TranslateError> {
    let file = std::fs::File::open(path).map_err(|e| io_to_input_error(e, path))?;
    let mut head = Vec::with_capacity(HEAD_LEN);
    file.take(HEAD_LEN as u64)
        .read_to_end(&mut head)
        .map_err(|e| io_to_input_error(e, path))?;
    Ok(head)
}

/// Size of the file in bytes.
pub fn file_size(path: &Path) -> Result<u64, TranslateError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| io_to_input_error(e, path))
}

/// The path an input's output is named after.
///
/// Local inputs name themselves; URLs use the same file name the download is
/// stored under, so naming checks and writes always agree.
pub fn naming_source(input: &str) -> PathBuf {
    if is_url(input) {
        PathBuf::from(filename_from_url(input))
    } else {
        PathBuf::from(input)
    }
}

fn io_to_input_error(e: std::io::Error, path: &Path) -> TranslateError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => TranslateError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => TranslateError::FileNotFound {
            path: path.to_path_buf(),
        },
    }
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, TranslateError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TranslateError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            TranslateError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            TranslateError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(TranslateError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let filename = filename_from_url(url);

    let temp_dir = TempDir::new().map_err(|e| TranslateError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| TranslateError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| TranslateError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        content_type,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://example.com/files/scan.png?x=1"),
            "scan.png"
        );
        assert_eq!(filename_from_url("https://example.com/download"), "downloaded");
        assert_eq!(filename_from_url("https://example.com/"), "downloaded");
    }

    #[test]
    fn urls_are_named_like_their_download() {
        assert_eq!(
            naming_source("https://example.com/files/scan.png?x=1"),
            PathBuf::from("scan.png")
        );
        assert_eq!(
            naming_source("http://h/get?id=1"),
            naming_source("http://h/get?id=2")
        );
        assert_eq!(naming_source("inputs/a.pdf"), PathBuf::from("inputs/a.pdf"));
    }

    #[test]
    fn file_size_propagates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"12345").unwrap();
        assert_eq!(file_size(&path).unwrap(), 5);
        assert!(matches!(
            file_size(&dir.path().join("gone.pdf")),
            Err(TranslateError::FileNotFound { .. })
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local("/definitely/not/here.pdf").err().unwrap();
        assert!(matches!(err, TranslateError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_local(dir.path().to_str().unwrap()).err().unwrap();
        assert!(matches!(err, TranslateError::NotAFile { .. }));
    }

    #[test]
    fn head_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![7u8; 1000]).unwrap();
        assert_eq!(read_head(&path).unwrap().len(), HEAD_LEN);
    }

    #[tokio::test]
    async fn reads_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();
        let resolved = resolve_input(path.to_str().unwrap(), 5).await.ok().unwrap();
        assert_eq!(resolved.path(), path.as_path());
        assert!(resolved.content_type().is_none());
        assert_eq!(read_document(resolved.path()).await.unwrap(), b"%PDF-1.4 body");
    }
}
