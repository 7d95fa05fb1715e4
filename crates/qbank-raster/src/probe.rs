//! Does a PDF carry a text layer, or is it a scan?
//!
//! Scanned papers have no extractable text and must go through the raster
//! pipeline; papers with a text layer can be typed from their text.

use std::path::Path;

use lopdf::Document;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{RasterError, RasterResult};

/// A page whose trimmed text is longer than this has a usable text layer.
pub const TEXT_LAYER_MIN_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageProbe {
    /// 1-indexed page number.
    pub number: u32,
    pub text_chars: usize,
    pub has_text_layer: bool,
    /// First characters of the page text, for a quick look.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sample: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfProbe {
    pub pages: Vec<PageProbe>,
}

impl PdfProbe {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// First page with a usable text layer.
    pub fn first_text_page(&self) -> Option<&PageProbe> {
        self.pages.iter().find(|p| p.has_text_layer)
    }

    /// No page has a usable text layer.
    pub fn is_scanned(&self) -> bool {
        self.first_text_page().is_none()
    }
}

const SAMPLE_CHARS: usize = 100;

/// Extract per-page text statistics with lopdf.
pub fn probe_pdf(path: &Path) -> RasterResult<PdfProbe> {
    if !path.is_file() {
        return Err(RasterError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "PDF not found"),
        ));
    }
    let doc = Document::load(path)?;

    let mut pages = Vec::new();
    for (number, _id) in doc.get_pages() {
        let text = match doc.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                debug!(page = number, error = %e, "no extractable text");
                String::new()
            }
        };
        let trimmed = text.trim();
        let text_chars = trimmed.chars().count();
        pages.push(PageProbe {
            number,
            text_chars,
            has_text_layer: text_chars > TEXT_LAYER_MIN_CHARS,
            sample: trimmed.chars().take(SAMPLE_CHARS).collect(),
        });
    }

    let probe = PdfProbe { pages };
    info!(
        path = %path.display(),
        pages = probe.page_count(),
        scanned = probe.is_scanned(),
        "probed PDF"
    );
    Ok(probe)
}
