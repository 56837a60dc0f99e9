/// Upload format gate: extension allow-list checked before any byte is stored
use std::path::Path;
use video_core::constants::ALLOWED_EXTENSIONS;

use crate::error::{AppError, Result};

/// Normalized (lower-case, dotted) extension of an allowed filename
pub fn validate_extension(filename: &str) -> Result<String> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else if ext.is_empty() {
        Err(AppError::UnsupportedMediaType(format!(
            "file '{filename}' has no extension"
        )))
    } else {
        Err(AppError::UnsupportedMediaType(ext))
    }
}
