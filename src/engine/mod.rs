//! Rendering-engine abstraction.
//!
//! The conversion core never touches a PDF library directly. It asks a
//! [`RenderEngine`] to open a [`DocumentSource`] and gets back a
//! [`RenderDocument`] handle that reports its page count and rasterises
//! pages. Closing a document is dropping its handle.
//!
//! Handles are not required to be `Send`: every worker thread opens its own
//! handle from the shared engine and keeps it on that thread. Concurrent
//! handles to the same bytes are independent copies, never shared state.

mod pdfium;

pub use pdfium::PdfiumEngine;

use crate::config::ColorSpace;
use crate::error::{PageError, Pdf2ImgError};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the document bytes come from.
///
/// Cloning is cheap: byte buffers are reference-counted so each worker can
/// hold the source without copying it.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file on disk.
    Path(PathBuf),
    /// An in-memory document.
    Bytes(Arc<[u8]>),
}

impl DocumentSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        DocumentSource::Path(path.into())
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        DocumentSource::Bytes(bytes.into())
    }

    /// Human-readable name for logs and errors.
    pub fn display_name(&self) -> String {
        match self {
            DocumentSource::Path(p) => p.display().to_string(),
            DocumentSource::Bytes(b) => format!("<{} bytes in memory>", b.len()),
        }
    }

    /// File stem used as the default image base name.
    pub fn file_stem(&self) -> Option<&str> {
        match self {
            DocumentSource::Path(p) => p.file_stem().and_then(|s| s.to_str()),
            DocumentSource::Bytes(_) => None,
        }
    }

    /// File name with extension, for labelling extracted text.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            DocumentSource::Path(p) => p.file_name().and_then(|s| s.to_str()),
            DocumentSource::Bytes(_) => None,
        }
    }

    /// Fail fast on a missing input file.
    pub fn validate(&self) -> Result<(), Pdf2ImgError> {
        match self {
            DocumentSource::Path(p) if !p.is_file() => Err(Pdf2ImgError::FileNotFound {
                path: p.to_path_buf(),
            }),
            _ => Ok(()),
        }
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        DocumentSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        DocumentSource::from_path(path)
    }
}

impl From<&str> for DocumentSource {
    fn from(path: &str) -> Self {
        DocumentSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for DocumentSource {
    fn from(bytes: Vec<u8>) -> Self {
        DocumentSource::from_bytes(bytes)
    }
}

impl From<Arc<[u8]>> for DocumentSource {
    fn from(bytes: Arc<[u8]>) -> Self {
        DocumentSource::Bytes(bytes)
    }
}

/// Opens documents. Shared by every worker, hence `Send + Sync`.
pub trait RenderEngine: Send + Sync {
    /// Open `source`, authenticating with `password` when given. The handle
    /// may borrow both the engine and the password.
    ///
    /// # Errors
    /// [`Pdf2ImgError::OpenFailed`] for unreadable input,
    /// [`Pdf2ImgError::PasswordRequired`] / [`Pdf2ImgError::WrongPassword`]
    /// for protected documents.
    fn open<'a>(
        &'a self,
        source: &DocumentSource,
        password: Option<&'a str>,
    ) -> Result<Box<dyn RenderDocument + 'a>, Pdf2ImgError>;
}

/// An open document owned by exactly one thread.
pub trait RenderDocument {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Rasterise page `index` (zero-based) at `scale`.
    fn render_page(
        &mut self,
        index: usize,
        scale: f32,
        color_space: ColorSpace,
    ) -> Result<DynamicImage, PageError>;

    /// Text layer of page `index`, words separated by single spaces.
    fn page_text(&mut self, index: usize) -> Result<String, PageError>;

    /// Declared natural language of the document (e.g. `en-US`), if any.
    fn language(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_only_for_paths() {
        let source = DocumentSource::from_path("/tmp/report.final.pdf");
        assert_eq!(source.file_stem(), Some("report.final"));
        assert_eq!(DocumentSource::from(vec![1, 2, 3]).file_stem(), None);
    }

    #[test]
    fn validate_reports_missing_file() {
        let err = DocumentSource::from("/definitely/not/here.pdf")
            .validate()
            .unwrap_err();
        assert!(matches!(err, Pdf2ImgError::FileNotFound { .. }));
    }

    #[test]
    fn shared_bytes_are_not_copied() {
        let bytes: Arc<[u8]> = Arc::from(vec![7u8; 8]);
        let source = DocumentSource::from_bytes(Arc::clone(&bytes));
        match source {
            DocumentSource::Bytes(held) => assert!(Arc::ptr_eq(&held, &bytes)),
            DocumentSource::Path(_) => panic!("expected a byte source"),
        }
        assert_eq!(DocumentSource::from(bytes).file_name(), None);
    }

    #[test]
    fn file_name_keeps_extension() {
        let source = DocumentSource::from("/tmp/report.final.pdf");
        assert_eq!(source.file_name(), Some("report.final.pdf"));
    }

    #[test]
    fn byte_sources_always_validate() {
        assert!(DocumentSource::from(Vec::new()).validate().is_ok());
        assert!(DocumentSource::from(vec![0u8; 4])
            .display_name()
            .contains("4 bytes"));
    }
}
