//! PDF rasterisation: render the page the teacher is viewing via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is
//! CPU-bound and not designed for async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool so
//! the Tokio workers serving other chat requests never stall on a render.
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI would produce a
//! 12,000 × 17,000 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded and the upload to the
//! vision model small.

use crate::config::ServerConfig;
use crate::error::AssistantError;
use crate::pipeline::encode::RenderedPage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Rendering knobs copied out of [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub dpi: u32,
    pub max_rendered_pixels: u32,
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl RenderSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            dpi: config.dpi.clamp(72, 400),
            max_rendered_pixels: config.max_rendered_pixels,
            pdfium_lib_path: config.pdfium_lib_path.clone(),
        }
    }

    fn scale(&self) -> f32 {
        self.dpi as f32 / PDF_POINTS_PER_INCH
    }
}

/// Bind pdfium from an explicit path, else `./`, else the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, AssistantError> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| AssistantError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Render one page of a PDF.
///
/// An index past the last page renders page 0 instead.
pub async fn render_page(
    pdf_path: &Path,
    page_index: usize,
    settings: &RenderSettings,
) -> Result<RenderedPage, AssistantError> {
    let path = pdf_path.to_path_buf();
    let settings = settings.clone();

    tokio::task::spawn_blocking(move || render_page_blocking(&path, page_index, &settings))
        .await
        .map_err(|e| AssistantError::Internal(format!("Render task panicked: {}", e)))?
}

/// Like [`render_page`], but a failure is logged and yields `None`.
///
/// The chat handler uses this and answers without a page image on `None`.
pub async fn page_image(
    pdf_path: &Path,
    page_index: usize,
    settings: &RenderSettings,
) -> Option<RenderedPage> {
    match render_page(pdf_path, page_index, settings).await {
        Ok(page) => Some(page),
        Err(e) => {
            warn!("Error converting PDF to image: {}", e);
            None
        }
    }
}

/// Blocking implementation of page rendering.
fn render_page_blocking(
    pdf_path: &Path,
    page_index: usize,
    settings: &RenderSettings,
) -> Result<RenderedPage, AssistantError> {
    let pdfium = bind_pdfium(settings.pdfium_lib_path.as_deref())?;

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| AssistantError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(AssistantError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }
    info!("PDF loaded: {} pages", total_pages);

    let idx = if page_index < total_pages {
        page_index
    } else {
        warn!(
            "Page {} out of range (total={}), using page 1",
            page_index + 1,
            total_pages
        );
        0
    };

    let max_pixels = settings.max_rendered_pixels as i32;
    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(settings.scale())
        .set_maximum_width(max_pixels)
        .set_maximum_height(max_pixels);

    let page = pages
        .get(idx as u16)
        .map_err(|e| AssistantError::RasterisationFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        })?;

    let bitmap = page.render_with_config(&render_config).map_err(|e| {
        AssistantError::RasterisationFailed {
            page: idx + 1,
            detail: format!("{:?}", e),
        }
    })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px at {} DPI",
        idx + 1,
        image.width(),
        image.height(),
        settings.dpi
    );

    RenderedPage::encode(idx, image).map_err(|e| AssistantError::RasterisationFailed {
        page: idx + 1,
        detail: format!("PNG encoding failed: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RenderSettings {
        RenderSettings {
            dpi: 72,
            max_rendered_pixels: 400,
            pdfium_lib_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    /// Write a blank three-page PDF, or `None` when pdfium is unavailable.
    fn blank_pdf(dir: &Path) -> Option<PathBuf> {
        let pdfium = match bind_pdfium(settings().pdfium_lib_path.as_deref()) {
            Ok(p) => p,
            Err(e) => {
                println!("SKIP: pdfium unavailable: {e}");
                return None;
            }
        };
        let mut doc = pdfium.create_new_pdf().ok()?;
        for _ in 0..3 {
            doc.pages_mut()
                .create_page_at_end(PdfPagePaperSize::a4())
                .ok()?;
        }
        let path = dir.join("blank.pdf");
        doc.save_to_file(&path).ok()?;
        Some(path)
    }

    #[test]
    fn scale_follows_dpi() {
        let s = RenderSettings {
            dpi: 144,
            ..RenderSettings::default()
        };
        assert!((s.scale() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn settings_clamp_dpi() {
        let mut config = ServerConfig::default();
        config.dpi = 1000;
        assert_eq!(RenderSettings::from_config(&config).dpi, 400);
    }

    #[tokio::test]
    async fn out_of_range_page_falls_back_to_first() {
        let dir = tempfile::tempdir().unwrap();
        let Some(pdf) = blank_pdf(dir.path()) else {
            return;
        };
        let page = render_page(&pdf, 99, &settings()).await.unwrap();
        assert_eq!(page.page_index, 0);
        assert!(page.width() > 0 && page.height() > 0);
        assert!(page.width().max(page.height()) <= 400);
        assert!(!page.png_base64.is_empty());
    }

    #[tokio::test]
    async fn in_range_page_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let Some(pdf) = blank_pdf(dir.path()) else {
            return;
        };
        let page = render_page(&pdf, 2, &settings()).await.unwrap();
        assert_eq!(page.page_index, 2);
    }

    #[tokio::test]
    async fn garbage_file_degrades_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();
        assert!(page_image(&path, 0, &settings()).await.is_none());
        assert!(page_image(&dir.path().join("missing.pdf"), 0, &settings())
            .await
            .is_none());
    }
}
