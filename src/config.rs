//! Configuration types for PDF-to-image conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. A config is cloned into the
//! conversion when it starts and never mutated afterwards, so one config can
//! drive many conversions concurrently.

use crate::error::Pdf2ImgError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a PDF-to-image conversion.
///
/// # Example
/// ```rust
/// use edgequake_pdf2img::{ConversionConfig, FailurePolicy, WorkerStrategy};
///
/// let config = ConversionConfig::builder()
///     .scale(2.0)
///     .use_worker_threads(true)
///     .worker_strategy(WorkerStrategy::Dynamic)
///     .failure_policy(FailurePolicy::Retry)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Zoom factor applied when rasterising. Default: 1.0.
    ///
    /// 1.0 renders at the page's native 72 DPI; 2.0 doubles both dimensions.
    pub scale: f32,

    /// Render in colour or grayscale. Default: [`ColorSpace::Rgb`].
    pub color_space: ColorSpace,

    /// Encoded image format. Default: [`ImageFormat::Png`].
    pub format: ImageFormat,

    /// JPEG quality (1–100). Ignored for PNG. Default: 85.
    pub jpeg_quality: u8,

    /// Directory images are written to. When `None`, nothing touches the disk
    /// and every [`crate::output::PageResult`] carries its encoded bytes.
    pub output_dir: Option<PathBuf>,

    /// Base name of written files. Defaults to the source file stem.
    pub file_name: Option<String>,

    /// Keep encoded bytes in results even when they are written to disk.
    pub include_buffer_content: bool,

    /// Zero-based pages to convert. Empty means every page. Out-of-range and
    /// duplicate entries are tolerated (see [`crate::pipeline::pages`]).
    pub pages: Vec<i64>,

    /// Password for encrypted documents.
    pub password: Option<String>,

    /// Render on worker threads instead of in-process. Default: false.
    pub use_worker_threads: bool,

    /// Upper bound on worker threads. Default: available cores − 1 (min 1).
    pub max_worker_threads: usize,

    /// Minimum pages each worker should receive. Default: 2.
    ///
    /// Spawning a worker means opening another document handle, so tiny
    /// batches are cheaper on fewer threads.
    pub min_pages_per_worker: usize,

    /// How pages are distributed across workers. Default: [`WorkerStrategy::Static`].
    pub worker_strategy: WorkerStrategy,

    /// What a dynamic worker does when a page fails. Default: [`crate::pool::FailurePolicy::Abort`].
    pub failure_policy: crate::pool::FailurePolicy,

    /// Ordering of dynamic-pool results. Default: [`ResultOrder::Completion`].
    pub result_order: ResultOrder,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            color_space: ColorSpace::default(),
            format: ImageFormat::default(),
            jpeg_quality: 85,
            output_dir: None,
            file_name: None,
            include_buffer_content: false,
            pages: Vec::new(),
            password: None,
            use_worker_threads: false,
            max_worker_threads: default_max_workers(),
            min_pages_per_worker: 2,
            worker_strategy: WorkerStrategy::default(),
            failure_policy: crate::pool::FailurePolicy::default(),
            result_order: ResultOrder::default(),
        }
    }
}

/// Available cores minus one for the coordinator, never below 1.
pub fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn color_space(mut self, color_space: ColorSpace) -> Self {
        self.config.color_space = color_space;
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = Some(name.into());
        self
    }

    pub fn include_buffer_content(mut self, v: bool) -> Self {
        self.config.include_buffer_content = v;
        self
    }

    pub fn pages(mut self, pages: impl Into<Vec<i64>>) -> Self {
        self.config.pages = pages.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn use_worker_threads(mut self, v: bool) -> Self {
        self.config.use_worker_threads = v;
        self
    }

    pub fn max_worker_threads(mut self, n: usize) -> Self {
        self.config.max_worker_threads = n.max(1);
        self
    }

    pub fn min_pages_per_worker(mut self, n: usize) -> Self {
        self.config.min_pages_per_worker = n.max(1);
        self
    }

    pub fn worker_strategy(mut self, strategy: WorkerStrategy) -> Self {
        self.config.worker_strategy = strategy;
        self
    }

    pub fn failure_policy(mut self, policy: crate::pool::FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn result_order(mut self, order: ResultOrder) -> Self {
        self.config.result_order = order;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2ImgError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale <= 0.0 || c.scale > 20.0 {
            return Err(Pdf2ImgError::InvalidConfig(format!(
                "Scale must be in (0, 20], got {}",
                c.scale
            )));
        }
        if c.max_worker_threads == 0 {
            return Err(Pdf2ImgError::InvalidConfig(
                "max_worker_threads must be ≥ 1".into(),
            ));
        }
        if c.min_pages_per_worker == 0 {
            return Err(Pdf2ImgError::InvalidConfig(
                "min_pages_per_worker must be ≥ 1".into(),
            ));
        }
        if let Some(name) = &c.file_name {
            if name.contains(['/', '\\']) {
                return Err(Pdf2ImgError::InvalidConfig(format!(
                    "file_name must not contain path separators, got '{name}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Colour model used for rasterisation and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    /// Full colour. (default)
    #[default]
    Rgb,
    /// Single luminance channel; smaller files for text-only documents.
    Gray,
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless. (default)
    #[default]
    Png,
    /// Lossy, see [`ConversionConfig::jpeg_quality`].
    Jpeg,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// MIME type of the encoded bytes.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Page distribution across worker threads.
///
/// | Strategy | Assignment | Best for |
/// |----------|-----------|----------|
/// | `Static` | fixed round-robin chunks up front | uniform pages, page-ordered output |
/// | `Dynamic` | idle workers pull the next page | heterogeneous page costs |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStrategy {
    #[default]
    Static,
    Dynamic,
}

/// Ordering of results returned by the dynamic pool.
///
/// Static and in-process conversions always return pages in the order they
/// were requested; this setting only affects [`WorkerStrategy::Dynamic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrder {
    /// The order workers reported pages. (default)
    #[default]
    Completion,
    /// Ascending page index.
    PageIndex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::FailurePolicy;

    #[test]
    fn defaults_are_valid() {
        let config = ConversionConfig::builder().build().expect("defaults build");
        assert_eq!(config.scale, 1.0);
        assert_eq!(config.min_pages_per_worker, 2);
        assert!(config.max_worker_threads >= 1);
        assert!(!config.use_worker_threads);
        assert_eq!(config.worker_strategy, WorkerStrategy::Static);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.result_order, ResultOrder::Completion);
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(ConversionConfig::builder().scale(0.0).build().is_err());
        assert!(ConversionConfig::builder().scale(f32::NAN).build().is_err());
    }

    #[test]
    fn rejects_file_name_with_separator() {
        let err = ConversionConfig::builder()
            .file_name("../escape")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("path separators"));
    }

    #[test]
    fn worker_counts_are_floored_at_one() {
        let config = ConversionConfig::builder()
            .max_worker_threads(0)
            .min_pages_per_worker(0)
            .build()
            .unwrap();
        assert_eq!(config.max_worker_threads, 1);
        assert_eq!(config.min_pages_per_worker, 1);
    }

    #[test]
    fn jpeg_quality_is_clamped() {
        let config = ConversionConfig::builder().jpeg_quality(0).build().unwrap();
        assert_eq!(config.jpeg_quality, 1);
    }

    #[test]
    fn enums_serialise_lowercase() {
        assert_eq!(serde_json::to_string(&ImageFormat::Jpeg).unwrap(), "\"jpeg\"");
        assert_eq!(serde_json::to_string(&WorkerStrategy::Dynamic).unwrap(), "\"dynamic\"");
        assert_eq!(serde_json::to_string(&ResultOrder::PageIndex).unwrap(), "\"page_index\"");
    }

    #[test]
    fn format_extension_and_mime() {
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpeg");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
    }
}
