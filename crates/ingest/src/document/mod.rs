pub mod segmenter;
mod txt;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// File looked up inside a directory passed as input.
pub const DEFAULT_INPUT_FILENAME: &str = "ocr_output.md";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is empty", .0.display())]
    Empty(PathBuf),
}

/// Resolve a user-supplied input path to a readable file.
///
/// A directory resolves to [`DEFAULT_INPUT_FILENAME`] inside it.
pub fn resolve_input_path(path: &Path) -> Result<PathBuf, IngestError> {
    let candidate = if path.is_dir() {
        path.join(DEFAULT_INPUT_FILENAME)
    } else {
        path.to_path_buf()
    };

    if !candidate.is_file() {
        return Err(IngestError::NotFound(candidate));
    }
    debug!(path = %candidate.display(), "Resolved input");
    Ok(candidate)
}

/// Read a text file, decoding it as UTF-8 (lossy on invalid bytes).
pub fn read_text(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            IngestError::NotFound(path.to_path_buf())
        } else {
            IngestError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Ok(txt::decode_text(&bytes))
}

/// Read a system prompt file. A prompt with no visible text is rejected.
pub fn read_prompt(path: &Path) -> Result<String, IngestError> {
    let prompt = read_text(path)?;
    if prompt.trim().is_empty() {
        return Err(IngestError::Empty(path.to_path_buf()));
    }
    Ok(prompt)
}

/// Resolve and read the source document.
pub fn load_document(path: &Path) -> Result<String, IngestError> {
    let resolved = resolve_input_path(path)?;
    read_text(&resolved)
}
