//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! Vision chat APIs accept images as base64 payloads embedded in the JSON
//! request body. PNG keeps rendered text crisp, which matters more than file
//! size when the model has to read a worksheet. `detail: "high"` lets
//! GPT-4-class models tile the full page instead of a single overview tile.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// One rasterised page and its PNG encoding.
#[derive(Clone)]
pub struct RenderedPage {
    /// Zero-based index of the page actually rendered (after clamping).
    pub page_index: usize,
    pub image: DynamicImage,
    pub png_base64: String,
}

impl RenderedPage {
    /// Encode `image` as PNG and keep both forms.
    pub fn encode(page_index: usize, image: DynamicImage) -> Result<Self, image::ImageError> {
        let png_base64 = encode_png_base64(&image)?;
        Ok(Self {
            page_index,
            image,
            png_base64,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Attachment for a vision chat message.
    pub fn image_data(&self) -> ImageData {
        ImageData::new(self.png_base64.clone(), "image/png").with_detail("high")
    }
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page_index", &self.page_index)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("png_base64_len", &self.png_base64.len())
            .finish()
    }
}

/// PNG-encode an image and return it as standard base64.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(b64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let page = RenderedPage::encode(0, img).expect("encode should succeed");
        assert_eq!((page.width(), page.height()), (10, 10));

        let data = page.image_data();
        assert_eq!(data.mime_type, "image/png");
        assert!(!data.data.is_empty());
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert!(decoded.starts_with(b"\x89PNG"));
    }

    #[test]
    fn debug_omits_payload() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        let page = RenderedPage::encode(2, img).unwrap();
        let dbg = format!("{page:?}");
        assert!(dbg.contains("page_index: 2"));
        assert!(!dbg.contains(&page.png_base64));
    }
}
