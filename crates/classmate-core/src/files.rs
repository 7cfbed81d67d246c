//! Loading teacher-supplied text files (essays, style samples).
//!
//! Only plain text and Markdown are accepted, up to 5 MiB each.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Largest accepted file, in bytes.
pub const MAX_TEXT_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Accepted file extensions (case-insensitive).
pub const ACCEPTED_EXTENSIONS: &[&str] = &["txt", "md"];

#[derive(Debug, Error)]
pub enum TextFileError {
    #[error("{path}: only .txt and .md files are accepted")]
    UnsupportedType { path: PathBuf },

    #[error("{path}: file is {size} bytes, each file must be less than 5MB")]
    TooLarge { path: PathBuf, size: u64 },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Check extension and size without reading the contents.
pub fn check_text_file(path: &Path, size: u64) -> Result<(), TextFileError> {
    let accepted = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ACCEPTED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)));
    if !accepted {
        return Err(TextFileError::UnsupportedType {
            path: path.to_path_buf(),
        });
    }
    if size > MAX_TEXT_FILE_BYTES {
        return Err(TextFileError::TooLarge {
            path: path.to_path_buf(),
            size,
        });
    }
    Ok(())
}

/// Validate and read a text file.
pub fn read_text_file(path: &Path) -> Result<String, TextFileError> {
    let io_err = |source| TextFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = std::fs::metadata(path).map_err(io_err)?;
    check_text_file(path, meta.len())?;
    std::fs::read_to_string(path).map_err(io_err)
}

/// File name component as UTF-8 (lossy), used to label essays.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
