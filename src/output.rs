//! Conversion results.
//!
//! A [`ConversionOutput`] is what [`crate::convert::Converter::convert`]
//! returns: one [`PageResult`] per rendered page plus run statistics.
//! Everything here is `Serialize` so the CLI can emit it as JSON; encoded
//! image bytes are base64-encoded in that form.

use crate::config::{ImageFormat, WorkerStrategy};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

/// One successfully rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Zero-based page index in the source document.
    pub page_index: usize,
    /// Encoded image format.
    pub format: ImageFormat,
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
    /// File name, when written to disk.
    pub name: Option<String>,
    /// Full path, when written to disk.
    pub path: Option<PathBuf>,
    /// Encoded bytes. Present when no output directory is configured or
    /// `include_buffer_content` is set.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub content: Option<Vec<u8>>,
    /// Render + encode + write time on the worker.
    pub render_duration_ms: u64,
}

/// Whether a conversion ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionState {
    /// Every targeted page was attempted.
    #[default]
    Completed,
    /// [`crate::convert::Converter::pause`] halted the in-process renderer;
    /// call [`crate::convert::Converter::resume`] to continue.
    Paused,
}

/// Aggregate statistics for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages targeted after resolving the selection.
    pub targeted_pages: usize,
    /// Pages that produced a result.
    pub rendered_pages: usize,
    /// Targeted pages that produced no result (skipped, or not reached yet
    /// when paused).
    pub skipped_pages: usize,
    /// Worker threads used; 0 for in-process conversion.
    pub worker_count: usize,
    /// Strategy used, `None` for in-process conversion.
    pub strategy: Option<WorkerStrategy>,
    /// Wall-clock time of the whole call.
    pub total_duration_ms: u64,
}

/// The result of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Rendered pages.
    ///
    /// Static and in-process conversions list pages in requested order. The
    /// dynamic pool lists them in completion order unless
    /// [`crate::config::ResultOrder::PageIndex`] is configured.
    pub pages: Vec<PageResult>,
    /// Resolved pages the conversion targeted, including skipped ones.
    pub targeted: Vec<usize>,
    pub stats: ConversionStats,
    pub state: ConversionState,
}

impl ConversionOutput {
    /// Result for `page_index`, if it was rendered.
    pub fn page(&self, page_index: usize) -> Option<&PageResult> {
        self.pages.iter().find(|p| p.page_index == page_index)
    }

    /// Targeted pages that produced no result.
    pub fn missing_pages(&self) -> Vec<usize> {
        self.targeted
            .iter()
            .copied()
            .filter(|idx| self.page(*idx).is_none())
            .collect()
    }

    /// Combined size in bytes of the image files this conversion wrote.
    ///
    /// Sizes are read from disk, so files changed since the conversion are
    /// measured as they are now. Pages kept only in memory count for nothing.
    ///
    /// # Errors
    /// The first file that can no longer be read.
    pub fn total_size_on_disk(&self) -> io::Result<u64> {
        self.pages
            .iter()
            .filter_map(|p| p.path.as_deref())
            .try_fold(0u64, |total, path| {
                Ok(total + std::fs::metadata(path)?.len())
            })
    }
}

/// Text layer of one page, as returned by
/// [`crate::convert::Converter::text_content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Source file name; `None` for in-memory documents.
    pub name: Option<String>,
    /// Zero-based page index in the source document.
    pub page_index: usize,
    /// Page words separated by single spaces.
    pub text: String,
    /// Declared document language, `unknown` when the document has none.
    pub language: String,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => s.serialize_some(&STANDARD.encode(b)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(page: usize, content: Option<Vec<u8>>) -> PageResult {
        PageResult {
            page_index: page,
            format: ImageFormat::Png,
            width: 10,
            height: 20,
            name: None,
            path: None,
            content,
            render_duration_ms: 1,
        }
    }

    #[test]
    fn missing_pages_lists_unrendered_targets() {
        let output = ConversionOutput {
            pages: vec![result(4, None), result(1, None)],
            targeted: vec![1, 2, 4],
            stats: ConversionStats::default(),
            state: ConversionState::Completed,
        };
        assert_eq!(output.missing_pages(), vec![2]);
        assert_eq!(output.page(4).map(|p| p.page_index), Some(4));
    }

    #[test]
    fn content_is_base64_in_json() {
        let json = serde_json::to_value(result(0, Some(vec![0x89, b'P', b'N', b'G']))).unwrap();
        assert_eq!(json["content"], "iVBORw==");

        let back: PageResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.content.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
    }

    #[test]
    fn total_size_counts_written_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("doc_0.png");
        let second = dir.path().join("doc_1.png");
        std::fs::write(&first, [0u8; 100]).unwrap();
        std::fs::write(&second, [0u8; 23]).unwrap();

        let mut on_disk = result(0, None);
        on_disk.path = Some(first);
        let mut also_on_disk = result(1, None);
        also_on_disk.path = Some(second);
        let output = ConversionOutput {
            pages: vec![on_disk, also_on_disk, result(2, Some(vec![1, 2, 3]))],
            targeted: vec![0, 1, 2],
            stats: ConversionStats::default(),
            state: ConversionState::Completed,
        };

        assert_eq!(output.total_size_on_disk().unwrap(), 123);
    }

    #[test]
    fn total_size_reports_vanished_file() {
        let mut gone = result(0, None);
        gone.path = Some(PathBuf::from("/definitely/not/here.png"));
        let output = ConversionOutput {
            pages: vec![gone],
            targeted: vec![0],
            stats: ConversionStats::default(),
            state: ConversionState::Completed,
        };

        assert!(output.total_size_on_disk().is_err());
    }

    #[test]
    fn absent_content_is_omitted() {
        let json = serde_json::to_value(result(0, None)).unwrap();
        assert!(json.get("content").is_none());
    }
}
