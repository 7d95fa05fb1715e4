//! Rasterizing PDF pages with pdfium.
//!
//! The pdfium shared library is bound once per process. The copy bundled
//! next to the executable wins over a system-wide install, so a packaged
//! build does not depend on what the machine has.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::RgbaImage;
use pdfium_render::prelude::*;
use tracing::{debug, error, info};

use crate::crop::{crop_to, save_png};
use crate::error::{RasterError, RasterResult};
use qbank_core::PointRect;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Default page scale: 2x, i.e. 144 dpi.
pub const DEFAULT_SCALE: f32 = 2.0;

struct SyncPdfium(Pdfium);

// SAFETY: the `thread_safe` feature of pdfium-render serializes every call
// into the library behind a mutex.
unsafe impl Send for SyncPdfium {}
unsafe impl Sync for SyncPdfium {}

static PDFIUM: OnceLock<Result<SyncPdfium, String>> = OnceLock::new();

fn bundled_library_path() -> Option<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))?;
    if cfg!(target_os = "macos") {
        Some(exe_dir.join("../Frameworks/libpdfium.dylib"))
    } else if cfg!(target_os = "windows") {
        Some(exe_dir.join("pdfium.dll"))
    } else if cfg!(target_os = "linux") {
        Some(exe_dir.join("lib/libpdfium.so"))
    } else {
        None
    }
}

fn bind_pdfium() -> Result<SyncPdfium, String> {
    if let Some(path) = bundled_library_path().filter(|p| p.exists()) {
        match Pdfium::bind_to_library(&path) {
            Ok(bindings) => {
                info!(path = %path.display(), "using bundled pdfium");
                return Ok(SyncPdfium(Pdfium::new(bindings)));
            }
            Err(e) => debug!(path = %path.display(), error = ?e, "bundled pdfium failed to load"),
        }
    }
    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            info!("using system pdfium");
            Ok(SyncPdfium(Pdfium::new(bindings)))
        }
        Err(e) => {
            error!(error = ?e, "no pdfium library available");
            Err(format!(
                "install libpdfium on the library path or place it next to the executable ({e:?})"
            ))
        }
    }
}

/// The process-wide pdfium binding. A failed bind is cached too.
fn pdfium() -> RasterResult<&'static Pdfium> {
    PDFIUM
        .get_or_init(bind_pdfium)
        .as_ref()
        .map(|p| &p.0)
        .map_err(|e| RasterError::LibraryUnavailable(e.clone()))
}

fn page_index(page: usize, count: usize) -> RasterResult<u16> {
    if page >= count {
        return Err(RasterError::PageOutOfRange {
            page: page + 1,
            count,
        });
    }
    u16::try_from(page).map_err(|_| RasterError::PageOutOfRange {
        page: page + 1,
        count,
    })
}

/// A page written by [`PageRenderer::render_pages`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// 1-indexed page number.
    pub number: usize,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// File name for a rendered page: `page_{n}.png`, 1-indexed.
pub fn page_file_name(number: usize) -> String {
    format!("page_{number}.png")
}

/// Renders pages of PDF files.
pub struct PageRenderer {
    pdfium: &'static Pdfium,
}

impl PageRenderer {
    /// Bind pdfium (once per process).
    pub fn new() -> RasterResult<Self> {
        Ok(Self { pdfium: pdfium()? })
    }

    fn open<'a>(&'a self, pdf: &Path) -> RasterResult<PdfDocument<'a>> {
        if !pdf.is_file() {
            return Err(RasterError::io(
                pdf,
                std::io::Error::new(std::io::ErrorKind::NotFound, "PDF not found"),
            ));
        }
        self.pdfium
            .load_pdf_from_file(pdf, None)
            .map_err(|e| RasterError::Render(format!("{}: {e:?}", pdf.display())))
    }

    pub fn page_count(&self, pdf: &Path) -> RasterResult<usize> {
        Ok(self.open(pdf)?.pages().len() as usize)
    }

    fn render_loaded(
        document: &PdfDocument<'_>,
        page: usize,
        scale: f32,
    ) -> RasterResult<RgbaImage> {
        let count = document.pages().len() as usize;
        let index = page_index(page, count)?;
        let pdf_page = document
            .pages()
            .get(index)
            .map_err(|e| RasterError::Render(format!("page {}: {e:?}", page + 1)))?;
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| RasterError::Render(format!("page {}: {e:?}", page + 1)))?;
        Ok(bitmap.as_image().to_rgba8())
    }

    /// Render one page (0-indexed) at `scale` pixels per point.
    pub fn render_page(&self, pdf: &Path, page: usize, scale: f32) -> RasterResult<RgbaImage> {
        let document = self.open(pdf)?;
        Self::render_loaded(&document, page, scale)
    }

    /// Render `pages` (0-indexed) into `out_dir` as `page_{n}.png`. An empty
    /// selection renders every page.
    pub fn render_pages(
        &self,
        pdf: &Path,
        pages: &[usize],
        scale: f32,
        out_dir: &Path,
    ) -> RasterResult<Vec<RenderedPage>> {
        let document = self.open(pdf)?;
        let count = document.pages().len() as usize;
        let selection: Vec<usize> = if pages.is_empty() {
            (0..count).collect()
        } else {
            pages.to_vec()
        };
        info!(pdf = %pdf.display(), pages = selection.len(), scale, "rendering pages");

        let mut rendered = Vec::with_capacity(selection.len());
        for page in selection {
            let image = Self::render_loaded(&document, page, scale)?;
            let path = out_dir.join(page_file_name(page + 1));
            save_png(&image, &path)?;
            rendered.push(RenderedPage {
                number: page + 1,
                path,
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(rendered)
    }

    /// Render the part of a page given in PDF points at `dpi`.
    pub fn render_clip(
        &self,
        pdf: &Path,
        page: usize,
        clip: PointRect,
        dpi: f32,
    ) -> RasterResult<RgbaImage> {
        let scale = dpi / POINTS_PER_INCH;
        let image = self.render_page(pdf, page, scale)?;
        let rect = clip.to_pixels(scale);
        debug!(page = page + 1, ?clip, crop = %rect, "clipping page");
        crop_to(&image, rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_are_one_indexed() {
        assert_eq!(page_file_name(1), "page_1.png");
        assert_eq!(page_file_name(27), "page_27.png");
    }

    #[test]
    fn page_index_checks_range() {
        assert_eq!(page_index(0, 3).unwrap(), 0);
        let err = page_index(3, 3).unwrap_err();
        assert_eq!(err.to_string(), "page 4 out of range (document has 3 pages)");
    }

    #[test]
    fn clip_scale_from_dpi() {
        let clip = PointRect::new(36.0, 72.0, 576.0, 144.0);
        let rect = clip.to_pixels(150.0 / POINTS_PER_INCH);
        assert_eq!(rect.left, 75);
        assert_eq!(rect.top, 150);
        assert_eq!(rect.right, 1200);
        assert_eq!(rect.bottom, 300);
    }
}
