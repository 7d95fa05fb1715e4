//! Bounding box of content inside a search window.
//!
//! Diagram crops are described by a loose search window (the part of a page
//! where the figure is known to be). The detector shrinks that window to the
//! pixels that actually carry ink and pads the result.

use std::ops::Range;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ink::InkClassifier;
use qbank_core::PixelRect;

/// Area of an image to search. `None` on an axis means the whole axis.
/// Ranges are half-open and are clamped to the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    #[serde(default)]
    pub x: Option<Range<u32>>,
    #[serde(default)]
    pub y: Option<Range<u32>>,
}

impl SearchWindow {
    /// The whole image.
    pub fn full() -> Self {
        Self::default()
    }

    /// Full-width strip of rows.
    pub fn rows(y: Range<u32>) -> Self {
        Self { x: None, y: Some(y) }
    }

    pub fn with_columns(mut self, x: Range<u32>) -> Self {
        self.x = Some(x);
        self
    }

    /// The window as a rect inside a `width` x `height` image.
    pub fn resolve(&self, width: u32, height: u32) -> PixelRect {
        let (left, right) = match &self.x {
            Some(r) => (r.start, r.end),
            None => (0, width),
        };
        let (top, bottom) = match &self.y {
            Some(r) => (r.start, r.end),
            None => (0, height),
        };
        PixelRect::new(left, top, right, bottom).clamped(width, height)
    }
}

/// Tightest rect around every ink pixel inside `window`, or `None` when the
/// window holds no ink.
pub fn content_bbox(
    image: &RgbaImage,
    window: &SearchWindow,
    ink: &InkClassifier,
) -> Option<PixelRect> {
    let area = window.resolve(image.width(), image.height());
    let mut found: Option<PixelRect> = None;

    for y in area.top..area.bottom {
        for x in area.left..area.right {
            if !ink.is_ink(image.get_pixel(x, y)) {
                continue;
            }
            let px = PixelRect::new(x, y, x + 1, y + 1);
            found = Some(match found {
                Some(rect) => rect.union(&px),
                None => px,
            });
        }
    }
    found
}

/// What to do when a search window holds no ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    /// Report [`Detection::Empty`]; the caller skips the crop.
    #[default]
    Skip,
    /// Crop the (padded) search window itself, unless the window lies
    /// entirely outside the image.
    UseWindow,
}

/// Outcome of [`detect_region`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Content found; padded and clamped bounding box.
    Found(PixelRect),
    /// Nothing found; padded window, per [`EmptyPolicy::UseWindow`].
    Fallback(PixelRect),
    /// Nothing found and nothing to crop.
    Empty,
}

impl Detection {
    pub fn rect(&self) -> Option<PixelRect> {
        match self {
            Detection::Found(rect) | Detection::Fallback(rect) => Some(*rect),
            Detection::Empty => None,
        }
    }
}

/// Find the content inside `window` and pad it by `padding` pixels on every
/// side, clamped to the image.
pub fn detect_region(
    image: &RgbaImage,
    window: &SearchWindow,
    ink: &InkClassifier,
    padding: u32,
    policy: EmptyPolicy,
) -> Detection {
    let (width, height) = image.dimensions();
    match content_bbox(image, window, ink) {
        Some(rect) => {
            let padded = rect.padded(padding, width, height);
            debug!(content = %rect, crop = %padded, "content detected");
            Detection::Found(padded)
        }
        None => {
            let area = window.resolve(width, height);
            match policy {
                EmptyPolicy::UseWindow if area.is_empty() => {
                    warn!(window = %area, "search window lies outside the page, skipping");
                    Detection::Empty
                }
                EmptyPolicy::Skip => {
                    warn!(window = %area, "no content found in search window, skipping");
                    Detection::Empty
                }
                EmptyPolicy::UseWindow => {
                    warn!(window = %area, "no content found in search window, using the window");
                    Detection::Fallback(area.padded(padding, width, height))
                }
            }
        }
    }
}
