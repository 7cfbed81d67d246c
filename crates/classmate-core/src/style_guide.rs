//! The teacher's style guide: writing samples that steer the tone of
//! generated feedback.
//!
//! The guide is a client-side preference. The server never stores it; the
//! CLI keeps it in a local file and sends it along with grading requests.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::files::{self, TextFileError};

/// Separator placed between combined samples.
pub const SAMPLE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Error)]
pub enum StyleGuideError {
    #[error("at least one style sample file is required")]
    NoSamples,

    #[error(transparent)]
    Sample(#[from] TextFileError),

    #[error("style guide file {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Join sample texts into one guide.
pub fn combine_samples<S: AsRef<str>>(samples: &[S]) -> String {
    samples
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(SAMPLE_SEPARATOR)
}

/// Read and combine sample files. Every file is validated before any is read.
pub fn load_samples(paths: &[PathBuf]) -> Result<String, StyleGuideError> {
    if paths.is_empty() {
        return Err(StyleGuideError::NoSamples);
    }
    for path in paths {
        let meta = std::fs::metadata(path).map_err(|source| TextFileError::Io {
            path: path.clone(),
            source,
        })?;
        files::check_text_file(path, meta.len())?;
    }
    let samples = paths
        .iter()
        .map(|p| files::read_text_file(p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(combine_samples(&samples))
}

/// File-backed storage for the style guide.
#[derive(Debug, Clone)]
pub struct StyleGuideStore {
    path: PathBuf,
}

impl StyleGuideStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved guide. A missing or blank file means no guide.
    pub fn load(&self) -> Result<Option<String>, StyleGuideError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.store_err(source)),
        }
    }

    /// Replace the saved guide, creating parent directories as needed.
    pub fn save(&self, guide: &str) -> Result<(), StyleGuideError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| self.store_err(e))?;
        }
        std::fs::write(&self.path, guide).map_err(|e| self.store_err(e))?;
        info!(path = %self.path.display(), chars = guide.len(), "style guide saved");
        Ok(())
    }

    /// Remove the saved guide. Returns `false` if there was none.
    pub fn clear(&self) -> Result<bool, StyleGuideError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(self.store_err(source)),
        }
    }

    fn store_err(&self, source: std::io::Error) -> StyleGuideError {
        StyleGuideError::Store {
            path: self.path.clone(),
            source,
        }
    }
}
