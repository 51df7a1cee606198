//! [`RenderEngine`] backed by pdfium via `pdfium-render`.
//!
//! ## Binding once per process
//!
//! Binding loads a shared library, so it happens once and the resulting
//! [`Pdfium`] lives for the rest of the process. `thread_safe` makes
//! `pdfium-render` serialise every call into the library; `sync` is what
//! marks [`Pdfium`] as `Send + Sync` so a single `&'static Pdfium` can be
//! handed to every worker thread. Both features are required. Each worker
//! still opens its own `PdfDocument`.
//!
//! Lookup order: `PDFIUM_LIB_PATH`, then the working directory, then the
//! system library path.

use super::{DocumentSource, RenderDocument, RenderEngine};
use crate::config::ColorSpace;
use crate::error::{PageError, Pdf2ImgError};
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use tracing::{debug, info};

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

fn pdfium() -> Result<&'static Pdfium, Pdf2ImgError> {
    PDFIUM.get_or_try_init(|| {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(path) if !path.is_empty() => {
                debug!("Binding pdfium from PDFIUM_LIB_PATH={}", path);
                Pdfium::bind_to_library(&path)
            }
            _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| Pdf2ImgError::PdfiumBindingFailed(format!("{:?}", e)))?;

        info!("pdfium bound");
        Ok(Pdfium::new(bindings))
    })
}

/// The default engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumEngine;

impl PdfiumEngine {
    pub fn new() -> Self {
        Self
    }

    /// Bind pdfium now instead of on first open, surfacing binding errors early.
    pub fn ensure_bound(&self) -> Result<(), Pdf2ImgError> {
        pdfium().map(|_| ())
    }
}

impl RenderEngine for PdfiumEngine {
    fn open<'a>(
        &'a self,
        source: &DocumentSource,
        password: Option<&'a str>,
    ) -> Result<Box<dyn RenderDocument + 'a>, Pdf2ImgError> {
        let pdfium = pdfium()?;

        let loaded = match source {
            DocumentSource::Path(path) => pdfium.load_pdf_from_file(path, password),
            DocumentSource::Bytes(bytes) => pdfium.load_pdf_from_byte_vec(bytes.to_vec(), password),
        };

        let document = loaded.map_err(|e| {
            let source_name = source.display_name();
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    Pdf2ImgError::WrongPassword { source_name }
                } else {
                    Pdf2ImgError::PasswordRequired { source_name }
                }
            } else {
                Pdf2ImgError::OpenFailed {
                    source_name,
                    detail: err_str,
                }
            }
        })?;

        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RenderDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(
        &mut self,
        index: usize,
        scale: f32,
        color_space: ColorSpace,
    ) -> Result<DynamicImage, PageError> {
        let render_failed = |e: PdfiumError| PageError::RenderFailed {
            page: index,
            detail: format!("{:?}", e),
        };

        let page_index = u16::try_from(index).map_err(|_| PageError::RenderFailed {
            page: index,
            detail: "page index exceeds pdfium's addressable range".into(),
        })?;

        let page = self.document.pages().get(page_index).map_err(render_failed)?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .use_grayscale_rendering(color_space == ColorSpace::Gray);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(render_failed)?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }

    fn page_text(&mut self, index: usize) -> Result<String, PageError> {
        let text_failed = |detail: String| PageError::TextFailed {
            page: index,
            detail,
        };

        let page_index =
            u16::try_from(index).map_err(|_| text_failed("page index out of range".into()))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| text_failed(format!("{:?}", e)))?;
        let text = page.text().map_err(|e| text_failed(format!("{:?}", e)))?;

        Ok(text.all().split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn bound_library_is_shareable_across_workers() {
        assert_send_sync::<Pdfium>();
        assert_send_sync::<PdfiumEngine>();
    }
}
