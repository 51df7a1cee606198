//! Single-page work unit shared by every execution path.
//!
//! Whether a page is rendered in-process, by a static worker or by a dynamic
//! worker, it goes through [`render_page`]: rasterise via the open
//! [`RenderDocument`], encode, optionally write to disk, and package a
//! [`PageResult`]. All of it is blocking and runs on the calling thread.

use crate::config::{ColorSpace, ConversionConfig, ImageFormat};
use crate::engine::{DocumentSource, RenderDocument};
use crate::error::PageError;
use crate::output::PageResult;
use crate::pipeline::{encode, pages};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Base name used when the source has no file stem.
pub const DEFAULT_BASE_NAME: &str = "page";

/// Everything a worker needs to turn a page index into a [`PageResult`].
///
/// Derived once per conversion and shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub scale: f32,
    pub color_space: ColorSpace,
    pub format: ImageFormat,
    pub jpeg_quality: u8,
    pub output_dir: Option<PathBuf>,
    pub base_name: String,
    pub pad_width: usize,
    pub include_buffer_content: bool,
}

impl RenderSettings {
    /// Settings for converting `targets` of `source` under `config`.
    pub fn new(config: &ConversionConfig, source: &DocumentSource, targets: &[usize]) -> Self {
        let base_name = config
            .file_name
            .clone()
            .or_else(|| source.file_stem().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string());

        Self {
            scale: config.scale,
            color_space: config.color_space,
            format: config.format,
            jpeg_quality: config.jpeg_quality,
            output_dir: config.output_dir.clone(),
            base_name,
            pad_width: pages::pad_width(targets),
            include_buffer_content: config.include_buffer_content,
        }
    }

    /// `<base>_<zero-padded index>.<ext>`
    pub fn image_name(&self, page: usize) -> String {
        format!(
            "{}_{:0width$}.{}",
            self.base_name,
            page,
            self.format.extension(),
            width = self.pad_width
        )
    }
}

/// Render, encode and (optionally) persist one page.
pub fn render_page(
    document: &mut dyn RenderDocument,
    page: usize,
    settings: &RenderSettings,
) -> Result<PageResult, PageError> {
    let started = Instant::now();

    let image = document.render_page(page, settings.scale, settings.color_space)?;

    let bytes = encode::encode_image(
        &image,
        settings.format,
        settings.color_space,
        settings.jpeg_quality,
    )
    .map_err(|e| PageError::EncodeFailed {
        page,
        detail: e.to_string(),
    })?;

    let (name, path) = match &settings.output_dir {
        Some(dir) => {
            let name = settings.image_name(page);
            let path = dir.join(&name);
            std::fs::write(&path, &bytes).map_err(|e| PageError::WriteFailed {
                page,
                path: path.clone(),
                detail: e.to_string(),
            })?;
            (Some(name), Some(path))
        }
        None => (None, None),
    };

    let content = (settings.output_dir.is_none() || settings.include_buffer_content).then_some(bytes);
    let render_duration_ms = started.elapsed().as_millis() as u64;
    debug!("Page {} done in {}ms", page, render_duration_ms);

    Ok(PageResult {
        page_index: page,
        format: settings.format,
        width: image.width(),
        height: image.height(),
        name,
        path,
        content,
        render_duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    struct Blank;

    impl RenderDocument for Blank {
        fn page_count(&self) -> usize {
            3
        }

        fn render_page(
            &mut self,
            index: usize,
            _scale: f32,
            _color_space: ColorSpace,
        ) -> Result<DynamicImage, PageError> {
            if index == 2 {
                return Err(PageError::RenderFailed {
                    page: index,
                    detail: "broken content stream".into(),
                });
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::new(4, 6)))
        }

        fn page_text(&mut self, _index: usize) -> Result<String, PageError> {
            Ok(String::new())
        }
    }

    fn settings(output_dir: Option<PathBuf>, include: bool) -> RenderSettings {
        let mut builder = ConversionConfig::builder().include_buffer_content(include);
        if let Some(dir) = output_dir {
            builder = builder.output_dir(dir);
        }
        let config = builder.build().unwrap();
        RenderSettings::new(&config, &DocumentSource::from("/docs/report.pdf"), &[0, 1, 12])
    }

    #[test]
    fn image_name_is_padded_to_highest_index() {
        let s = settings(None, false);
        assert_eq!(s.base_name, "report");
        assert_eq!(s.image_name(1), "report_01.png");
        assert_eq!(s.image_name(12), "report_12.png");
    }

    #[test]
    fn byte_sources_fall_back_to_default_base_name() {
        let config = ConversionConfig::default();
        let s = RenderSettings::new(&config, &DocumentSource::from(vec![0u8]), &[0]);
        assert_eq!(s.image_name(0), "page_0.png");
    }

    #[test]
    fn in_memory_render_keeps_content() {
        let result = render_page(&mut Blank, 1, &settings(None, false)).unwrap();
        assert_eq!(result.page_index, 1);
        assert_eq!((result.width, result.height), (4, 6));
        assert!(result.content.is_some());
        assert!(result.path.is_none());
    }

    #[test]
    fn disk_render_writes_file_and_drops_content() {
        let dir = tempfile::tempdir().unwrap();
        let result = render_page(&mut Blank, 0, &settings(Some(dir.path().into()), false)).unwrap();

        let path = result.path.expect("written to disk");
        assert_eq!(result.name.as_deref(), Some("report_00.png"));
        assert!(path.is_file());
        assert!(result.content.is_none());
    }

    #[test]
    fn include_buffer_content_keeps_bytes_on_disk_render() {
        let dir = tempfile::tempdir().unwrap();
        let result = render_page(&mut Blank, 0, &settings(Some(dir.path().into()), true)).unwrap();
        assert!(result.path.is_some());
        assert!(result.content.is_some());
    }

    #[test]
    fn render_failure_is_page_scoped() {
        let err = render_page(&mut Blank, 2, &settings(None, false)).unwrap_err();
        assert_eq!(err.page(), 2);
    }

    #[test]
    fn missing_output_dir_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("never-created");
        let err = render_page(&mut Blank, 0, &settings(Some(gone), false)).unwrap_err();
        assert!(matches!(err, PageError::WriteFailed { page: 0, .. }));
    }
}
