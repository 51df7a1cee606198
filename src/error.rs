//! Error types for the edgequake-pdf2img library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2ImgError`]: **Fatal**: the conversion cannot proceed (bad input
//!   file, wrong password, a worker thread died, a page failed under the
//!   `Abort` policy). Returned as `Err(Pdf2ImgError)` from
//!   [`crate::convert::Converter::convert`] and friends.
//!
//! * [`PageError`]: **Page-scoped**: one page failed to render, encode or
//!   be written. Inside the dynamic pool it is handed to the
//!   [`crate::pool::FailurePolicy`]; it only becomes fatal when wrapped in
//!   [`Pdf2ImgError::PageFailed`].
//!
//! Requested pages outside the document are neither: they are dropped by
//! [`crate::pipeline::pages::resolve_pages`] with a warning.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2img library.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    // ── Document errors ───────────────────────────────────────────────────
    /// The source could not be parsed as a document.
    #[error("Cannot open '{source_name}': {detail}")]
    OpenFailed { source_name: String, detail: String },

    /// The document requires a password but none was provided.
    #[error("'{source_name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { source_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for '{source_name}'")]
    WrongPassword { source_name: String },

    // ── Worker errors ─────────────────────────────────────────────────────
    /// A page failed and the active policy does not tolerate it.
    #[error("Conversion aborted: {source}")]
    PageFailed {
        page: usize,
        #[source]
        source: PageError,
    },

    /// A worker thread died without reporting a page-level error.
    #[error("Worker {worker} crashed: {detail}")]
    WorkerCrashed { worker: usize, detail: String },

    // ── Control errors ────────────────────────────────────────────────────
    /// [`crate::convert::Converter::stop`] was called while converting.
    #[error("Conversion stopped")]
    Stopped,

    /// [`crate::convert::Converter::resume`] was called with nothing paused.
    #[error("No paused conversion to resume")]
    NotPaused,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to prepare output directory '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place the pdfium shared library next to the executable.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ImgError {
    /// Page index the error is attached to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            Pdf2ImgError::PageFailed { page, .. } => Some(*page),
            _ => None,
        }
    }
}

/// A page-scoped error reported by a worker.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The rendering engine could not rasterise the page.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Raw pixels could not be encoded to the requested format.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The encoded image could not be written to disk.
    #[error("Page {page}: failed to write '{path}': {detail}")]
    WriteFailed {
        page: usize,
        path: PathBuf,
        detail: String,
    },

    /// The page's text layer could not be read.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextFailed { page: usize, detail: String },
}

impl PageError {
    /// Zero-based index of the page that failed.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::EncodeFailed { page, .. }
            | PageError::WriteFailed { page, .. }
            | PageError::TextFailed { page, .. } => *page,
        }
    }

    /// Escalate to a fatal error.
    pub fn into_fatal(self) -> Pdf2ImgError {
        Pdf2ImgError::PageFailed {
            page: self.page(),
            source: self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_failed_display_includes_cause() {
        let e = PageError::RenderFailed {
            page: 3,
            detail: "bad xref".into(),
        }
        .into_fatal();
        let msg = e.to_string();
        assert!(msg.contains("Page 3"), "got: {msg}");
        assert!(msg.contains("bad xref"), "got: {msg}");
        assert_eq!(e.page(), Some(3));
    }

    #[test]
    fn worker_crash_display() {
        let e = Pdf2ImgError::WorkerCrashed {
            worker: 2,
            detail: "panicked".into(),
        };
        assert!(e.to_string().contains("Worker 2"));
        assert_eq!(e.page(), None);
    }

    #[test]
    fn password_required_display() {
        let e = Pdf2ImgError::PasswordRequired {
            source_name: "secret.pdf".into(),
        };
        assert!(e.to_string().contains("secret.pdf"));
        assert!(e.to_string().contains("--password"));
    }

    #[test]
    fn write_failed_reports_page() {
        let e = PageError::WriteFailed {
            page: 7,
            path: PathBuf::from("/tmp/x_7.png"),
            detail: "disk full".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().contains("x_7.png"));
    }
}
