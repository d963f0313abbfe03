//! Document Text Extraction
//!
//! Decodes uploaded documents into plain text before chunking. A document
//! that cannot be decoded surfaces an `Extraction` error and is never
//! partially indexed.
//!
//! Plain-text formats are handled here; binary formats (PDF, DOCX) require
//! vendor decoders that live outside this crate and arrive pre-extracted
//! through `RagService::index_text`.

use std::path::Path;
use tracing::debug;

use crate::types::{PlanError, Result};

/// File extensions this extractor decodes directly.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".txt", ".md"];

/// Extract text from a file given its declared type (`".txt"`, `".md"`).
pub fn extract_text(path: &Path, file_type: &str) -> Result<String> {
    let file_type = file_type.to_lowercase();

    if !SUPPORTED_EXTENSIONS.contains(&file_type.as_str()) {
        return Err(PlanError::extraction(
            path.display().to_string(),
            format!("unsupported file type: {}", file_type),
        ));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| PlanError::extraction(path.display().to_string(), e.to_string()))?;

    let text = String::from_utf8(bytes).map_err(|_| {
        PlanError::extraction(
            path.display().to_string(),
            "file is not valid UTF-8".to_string(),
        )
    })?;

    debug!(path = %path.display(), chars = text.len(), "extracted text");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_extracts_text_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hello document").unwrap();

        let text = extract_text(file.path(), ".txt").unwrap();
        assert!(text.contains("hello document"));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let file = NamedTempFile::new().unwrap();
        let err = extract_text(file.path(), ".exe").unwrap_err();
        assert!(matches!(err, PlanError::Extraction { .. }));
    }

    #[test]
    fn test_missing_file_is_extraction_error() {
        let err = extract_text(Path::new("/nonexistent/notes.md"), ".md").unwrap_err();
        assert!(matches!(err, PlanError::Extraction { .. }));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0x80]).unwrap();

        let err = extract_text(file.path(), ".txt").unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }
}
