//! Image encoding: `DynamicImage` → PNG/JPEG bytes.
//!
//! pdfium hands back RGBA bitmaps. JPEG has no alpha channel, so colour
//! renders are flattened to RGB before encoding; grayscale renders become a
//! single luma channel in either format.

use crate::config::{ColorSpace, ImageFormat};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError};
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page in the requested format.
pub fn encode_image(
    img: &DynamicImage,
    format: ImageFormat,
    color_space: ColorSpace,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ImageError> {
    let prepared = match (color_space, format) {
        (ColorSpace::Gray, _) => DynamicImage::ImageLuma8(img.to_luma8()),
        (ColorSpace::Rgb, ImageFormat::Jpeg) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (ColorSpace::Rgb, ImageFormat::Png) => img.clone(),
    };

    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => {
            prepared.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality.clamp(1, 100));
            prepared.write_with_encoder(encoder)?;
        }
    }

    debug!(
        "Encoded {}x{} image → {} bytes {}",
        prepared.width(),
        prepared.height(),
        buf.len(),
        format.extension()
    );
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn png_has_signature() {
        let bytes = encode_image(&red_square(), ImageFormat::Png, ColorSpace::Rgb, 85).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let bytes = encode_image(&red_square(), ImageFormat::Jpeg, ColorSpace::Rgb, 85).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn gray_png_decodes_as_luma() {
        let bytes = encode_image(&red_square(), ImageFormat::Png, ColorSpace::Gray, 85).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!((decoded.width(), decoded.height()), (10, 10));
    }
}
