//! Error types for raster and PDF operations.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Backend errors from
//! pdfium are kept as their debug text, since `PdfiumError` carries no
//! useful `Display`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for image and PDF work.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Decoding or encoding an image failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The pdfium library could not be loaded.
    #[error("pdfium library unavailable: {0}")]
    LibraryUnavailable(String),

    /// pdfium failed to open or render a document.
    #[error("PDF render error: {0}")]
    Render(String),

    /// lopdf failed to parse a document.
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),

    /// A page number outside the document was requested.
    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    /// Image dimensions or a crop rect are unusable.
    #[error("invalid geometry: {0}")]
    Geometry(String),
}

impl RasterError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        RasterError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Convenience alias for results in this crate.
pub type RasterResult<T> = Result<T, RasterError>;
