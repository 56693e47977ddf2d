//! Result writing: name the translated file and put it on disk.
//!
//! Writes are atomic (temp file in the same directory, then rename) so an
//! interrupted run never leaves a truncated document behind under the final
//! name.

use crate::config::OutputNaming;
use crate::error::TranslateError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix appended to the input stem under [`OutputNaming::FromInput`].
pub const FROM_INPUT_SUFFIX: &str = "_translated";

/// Compute where a translated document goes.
pub fn output_path(dir: &Path, naming: &OutputNaming, input: &Path, extension: &str) -> PathBuf {
    let stem = match naming {
        OutputNaming::Fixed(stem) => stem.clone(),
        OutputNaming::FromInput => {
            let input_stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .unwrap_or("document");
            format!("{input_stem}{FROM_INPUT_SUFFIX}")
        }
    };
    dir.join(format!("{stem}.{extension}"))
}

/// Write `bytes` to `path`, creating parent directories.
pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<(), TranslateError> {
    let write_err = |source| TranslateError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        tokio::fs::remove_file(&tmp_path).await.ok();
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
