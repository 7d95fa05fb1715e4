//! qbank-raster: page images for the question-bank pipeline.
//!
//! Renders PDF pages with pdfium, probes PDFs for a text layer with lopdf,
//! and finds content on page images: whitespace-gap segmentation into
//! question blocks ([`scan`]) and bounding boxes inside search windows
//! ([`bbox`]). Crops and stitched figures are written as PNG.

pub mod bbox;
pub mod crop;
pub mod error;
pub mod ink;
pub mod probe;
pub mod render;
pub mod scan;

pub use bbox::{Detection, EmptyPolicy, SearchWindow, content_bbox, detect_region};
pub use crop::{crop_to, load_image, save_png, stitch_vertical};
pub use error::{RasterError, RasterResult};
pub use ink::{Brightness, InkClassifier, Polarity};
pub use probe::{PageProbe, PdfProbe, probe_pdf};
pub use render::{DEFAULT_SCALE, PageRenderer, RenderedPage, page_file_name};
pub use scan::{BlockScanOptions, BlockScanner, RowSpan, ScanState, find_content_blocks};
