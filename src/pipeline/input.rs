//! Text source: read a report file into plain text.
//!
//! A file whose first bytes are `%PDF` goes through pdfium's text layer;
//! anything else is read as UTF-8 text. Existence and read permission are
//! checked up-front so callers get a precise error instead of a pdfium one.
//!
//! ## Why spawn_blocking?
//!
//! pdfium wraps a C++ library with thread-local state. Text extraction runs
//! on the blocking pool so tokio worker threads never stall on it.

use crate::error::DdrError;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The kind of document found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Text,
}

/// Check the file is readable and sniff its kind from the magic bytes.
pub fn probe(path: &Path) -> Result<SourceKind, DdrError> {
    if !path.exists() {
        return Err(DdrError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DdrError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(DdrError::TextExtractionFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            });
        }
    };

    let mut magic = [0u8; 4];
    let kind = match file.read_exact(&mut magic) {
        Ok(()) if &magic == PDF_MAGIC => SourceKind::Pdf,
        _ => SourceKind::Text,
    };
    debug!("{}: {:?}", path.display(), kind);
    Ok(kind)
}

/// Read the full text of a report, PDF or plain text, trimmed.
pub async fn extract_text(path: &Path) -> Result<String, DdrError> {
    let text = match probe(path)? {
        SourceKind::Text => tokio::fs::read_to_string(path).await.map_err(|e| {
            DdrError::TextExtractionFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }
        })?,
        SourceKind::Pdf => {
            let owned = path.to_path_buf();
            tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&owned))
                .await
                .map_err(|e| DdrError::Internal(format!("Text extraction task panicked: {e}")))??
        }
    };

    let text = text.trim().to_string();
    info!("Read {} chars from {}", text.chars().count(), path.display());
    Ok(text)
}

/// Bind pdfium from `PDFIUM_LIB_PATH` (a file or a directory) or the
/// system library search path.
fn bind_pdfium() -> Result<Pdfium, DdrError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(raw) => {
            let mut lib = PathBuf::from(raw);
            if lib.is_dir() {
                lib = Pdfium::pdfium_platform_library_name_at_path(&lib);
            }
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| DdrError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

fn extract_pdf_text_blocking(path: &Path) -> Result<String, DdrError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| DdrError::TextExtractionFailed {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    debug!("PDF loaded: {} pages", pages.len());

    let mut out = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| DdrError::TextExtractionFailed {
            path: path.to_path_buf(),
            detail: format!("page {}: {e:?}", idx + 1),
        })?;
        out.push_str(&text.all());
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = extract_text(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, DdrError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn plain_text_is_read_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inspection.txt");
        std::fs::write(&path, "Hall\nDampness at skirting\n").unwrap();

        assert_eq!(probe(&path).unwrap(), SourceKind::Text);
        assert_eq!(
            extract_text(&path).await.unwrap(),
            "Hall\nDampness at skirting"
        );
    }

    #[test]
    fn pdf_magic_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.7\n...").unwrap();
        assert_eq!(probe(&path).unwrap(), SourceKind::Pdf);
    }

    #[test]
    fn short_file_is_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.txt");
        std::fs::write(&path, b"ab").unwrap();
        assert_eq!(probe(&path).unwrap(), SourceKind::Text);
    }

    #[tokio::test]
    async fn invalid_utf8_text_fails_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [0xffu8, 0xfe, 0xfd, 0xfc, 0xfb]).unwrap();
        let err = extract_text(&path).await.unwrap_err();
        assert!(matches!(err, DdrError::TextExtractionFailed { .. }));
    }
}
