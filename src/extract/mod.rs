//! Turning uploaded document bytes into normalized plain text.
//!
//! Dispatch picks a handler from the declared MIME type, falling back to the
//! filename extension when the MIME type is absent or generic. Every handler
//! feeds the same [`normalize`] pass, so downstream chunking sees one text
//! convention regardless of the source format.

mod docx;
#[cfg(feature = "ocr")]
mod ocr;
mod pdf;

use std::fmt;

use thiserror::Error;

/// Errors raised while turning uploaded bytes into plain text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No handler matched the declared MIME type or filename extension.
    #[error("Unsupported file format. Please upload PDF, DOCX, TXT, or image files.")]
    UnsupportedFormat,
    /// The file decoded, but no usable text remained after trimming.
    #[error("Could not extract text from the file. It might be empty or unreadable.")]
    EmptyExtraction,
    /// The file matched a handler but could not be decoded.
    #[error("Failed to read {kind} content: {message}")]
    Malformed {
        /// Source format whose handler rejected the payload.
        kind: SourceKind,
        /// Parser diagnostic captured from the underlying library.
        message: String,
    },
    /// Image uploads require the `ocr` build feature.
    #[error("Image OCR support is not enabled in this build")]
    OcrDisabled,
}

/// Source format resolved from the MIME type or filename.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Portable document format.
    Pdf,
    /// Word-processor markup document.
    Docx,
    /// Raster image handled through OCR.
    Image,
    /// Plain text or markdown.
    Text,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Image => "image",
            Self::Text => "text",
        };
        f.write_str(label)
    }
}

/// Resolve the source format from the declared MIME type, falling back to the
/// filename extension when the MIME type is missing or generic.
pub fn resolve_kind(mime: Option<&str>, filename: &str) -> Option<SourceKind> {
    let mime = mime.map(str::trim).filter(|value| !value.is_empty());
    if let Some(mime) = mime {
        match mime {
            "application/pdf" => return Some(SourceKind::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                return Some(SourceKind::Docx);
            }
            "text/plain" | "text/markdown" => return Some(SourceKind::Text),
            value if value.starts_with("image/") => return Some(SourceKind::Image),
            _ => {}
        }
    }

    let name = filename.to_lowercase();
    if name.ends_with(".pdf") {
        Some(SourceKind::Pdf)
    } else if name.ends_with(".docx") {
        Some(SourceKind::Docx)
    } else if name.ends_with(".jpg") || name.ends_with(".jpeg") || name.ends_with(".png") {
        Some(SourceKind::Image)
    } else if name.ends_with(".txt") || name.ends_with(".md") {
        Some(SourceKind::Text)
    } else {
        None
    }
}

/// Extract normalized plain text from an uploaded document.
///
/// Fails with [`ExtractError::UnsupportedFormat`] when no handler matches and
/// [`ExtractError::EmptyExtraction`] when the decoded text is empty or
/// whitespace-only.
pub fn extract(bytes: &[u8], mime: Option<&str>, filename: &str) -> Result<String, ExtractError> {
    let kind = resolve_kind(mime, filename).ok_or(ExtractError::UnsupportedFormat)?;
    tracing::debug!(filename, kind = %kind, bytes = bytes.len(), "Extracting document text");

    let raw = match kind {
        SourceKind::Pdf => pdf::extract_text(bytes)?,
        SourceKind::Docx => docx::extract_text(bytes)?,
        SourceKind::Text => String::from_utf8_lossy(bytes).into_owned(),
        SourceKind::Image => extract_image(bytes)?,
    };

    if raw.trim().is_empty() {
        return Err(ExtractError::EmptyExtraction);
    }

    Ok(normalize(&raw))
}

#[cfg(feature = "ocr")]
fn extract_image(bytes: &[u8]) -> Result<String, ExtractError> {
    ocr::extract_text(bytes)
}

#[cfg(not(feature = "ocr"))]
fn extract_image(_bytes: &[u8]) -> Result<String, ExtractError> {
    Err(ExtractError::OcrDisabled)
}

/// Normalize extracted text: strip NUL bytes, convert line endings to `\n`,
/// collapse runs of 3+ newlines to exactly 2, and trim the ends.
///
/// The pass is deterministic and idempotent; re-running it on its own output
/// is a no-op.
pub fn normalize(text: &str) -> String {
    let unix = text
        .replace('\u{0}', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut collapsed = String::with_capacity(unix.len());
    let mut newline_run = 0usize;
    for ch in unix.chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                collapsed.push(ch);
            }
        } else {
            newline_run = 0;
            collapsed.push(ch);
        }
    }

    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_nul_and_line_endings() {
        let input = "alpha\u{0}\r\nbeta\rgamma";
        assert_eq!(normalize(input), "alpha\nbeta\ngamma");
    }

    #[test]
    fn normalize_collapses_newline_runs() {
        assert_eq!(normalize("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "  Unit 1: Graphs\r\n\r\n\r\nA graph is a set of vertices and edges.  ",
            "plain",
            "\n\n\n",
            "tabs\tand \u{0} nulls\r\n\r\n\r\n\r\nend",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn resolve_kind_prefers_mime_type() {
        assert_eq!(
            resolve_kind(Some("application/pdf"), "notes.txt"),
            Some(SourceKind::Pdf)
        );
        assert_eq!(
            resolve_kind(Some("image/png"), "diagram.bin"),
            Some(SourceKind::Image)
        );
    }

    #[test]
    fn resolve_kind_falls_back_to_extension() {
        assert_eq!(
            resolve_kind(Some("application/octet-stream"), "Syllabus.PDF"),
            Some(SourceKind::Pdf)
        );
        assert_eq!(resolve_kind(None, "notes.md"), Some(SourceKind::Text));
        assert_eq!(resolve_kind(None, "archive.tar.gz"), None);
    }

    #[test]
    fn extract_rejects_unknown_formats() {
        let error = extract(b"bytes", None, "data.bin").unwrap_err();
        assert!(matches!(error, ExtractError::UnsupportedFormat));
    }

    #[test]
    fn extract_rejects_whitespace_only_text() {
        let error = extract(b"   \n\n  ", Some("text/plain"), "blank.txt").unwrap_err();
        assert!(matches!(error, ExtractError::EmptyExtraction));
    }

    #[test]
    fn extract_decodes_and_normalizes_plain_text() {
        let text = extract(
            b"Unit 1: Graphs\r\n\r\n\r\nA graph is a set of vertices and edges.\r\n",
            Some("text/plain"),
            "graphs.txt",
        )
        .expect("plain text extraction");
        assert_eq!(
            text,
            "Unit 1: Graphs\n\nA graph is a set of vertices and edges."
        );
    }
}
