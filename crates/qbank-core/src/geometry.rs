/// Pixel rectangle with top-left origin.
///
/// Edges are half-open: a rect covers columns `left..right` and rows
/// `top..bottom`. This is the coordinate convention of every detector and
/// crop in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rect spanning a whole `width` x `height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Width in pixels (zero for degenerate rects).
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Height in pixels (zero for degenerate rects).
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Smallest rect containing both.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grow by `padding` on every side, clamped to a `width` x `height` image.
    pub fn padded(&self, padding: u32, width: u32, height: u32) -> PixelRect {
        PixelRect {
            left: self.left.saturating_sub(padding),
            top: self.top.saturating_sub(padding),
            right: self.right.saturating_add(padding).min(width),
            bottom: self.bottom.saturating_add(padding).min(height),
        }
    }

    /// Clamp to a `width` x `height` image.
    pub fn clamped(&self, width: u32, height: u32) -> PixelRect {
        let right = self.right.min(width);
        let bottom = self.bottom.min(height);
        PixelRect {
            left: self.left.min(right),
            top: self.top.min(bottom),
            right,
            bottom,
        }
    }

    pub fn to_crop(&self) -> CropRect {
        CropRect {
            x: self.left,
            y: self.top,
            width: self.width(),
            height: self.height(),
        }
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Crop region as stored in question-bank image metadata.
///
/// This is the `{x, y, width, height}` shape the dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<PixelRect> for CropRect {
    fn from(rect: PixelRect) -> Self {
        rect.to_crop()
    }
}

/// Rectangle in PDF points (1/72 inch), top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PointRect {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl PointRect {
    pub fn new(x0: f32, top: f32, x1: f32, bottom: f32) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Convert to pixels for a page rendered at `scale` pixels per point.
    pub fn to_pixels(&self, scale: f32) -> PixelRect {
        let px = |v: f32| (v * scale).round().max(0.0) as u32;
        PixelRect::new(px(self.x0), px(self.top), px(self.x1), px(self.bottom))
    }
}
