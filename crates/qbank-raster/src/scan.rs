//! Whitespace-gap segmentation of a page into content blocks.
//!
//! A page is read top to bottom, one row at a time. Rows whose share of ink
//! pixels is below `empty_row_ratio` are empty. A block starts on the first
//! non-empty row and ends once more than `gap_threshold` empty rows follow
//! it. Blocks shorter than `min_block_height` (headers, page numbers, stray
//! marks) are dropped.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ink::InkClassifier;
use qbank_core::PixelRect;

/// Half-open range of rows `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowSpan {
    pub start: u32,
    pub end: u32,
}

impl RowSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full-width rect for this span, inset by `x_margin` on both sides.
    pub fn to_rect(&self, width: u32, x_margin: u32) -> PixelRect {
        let left = x_margin.min(width);
        let right = width.saturating_sub(x_margin).max(left);
        PixelRect::new(left, self.start, right, self.end)
    }
}

/// Tuning for [`find_content_blocks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockScanOptions {
    /// A block ends after more than this many consecutive empty rows.
    pub gap_threshold: u32,
    /// Blocks shorter than this are discarded.
    pub min_block_height: u32,
    /// A row is empty when fewer than this share of sampled pixels is ink.
    pub empty_row_ratio: f32,
    /// Sample every n-th pixel of a row.
    pub sample_step: u32,
    /// Rows to ignore at the top (running headers).
    pub skip_top: u32,
    /// Rows to ignore at the bottom (footers, page numbers).
    pub skip_bottom: u32,
    pub ink: InkClassifier,
}

impl Default for BlockScanOptions {
    fn default() -> Self {
        Self {
            gap_threshold: 40,
            min_block_height: 50,
            empty_row_ratio: 0.01,
            sample_step: 2,
            skip_top: 0,
            skip_bottom: 0,
            ink: InkClassifier::for_rows(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    /// Inside a block that began at `start`, with `gap` empty rows seen
    /// since the last content row.
    InBlock { start: u32, gap: u32 },
}

/// Two-state automaton fed one row classification at a time.
#[derive(Debug, Clone)]
pub struct BlockScanner {
    state: ScanState,
    gap_threshold: u32,
    min_block_height: u32,
}

impl BlockScanner {
    pub fn new(gap_threshold: u32, min_block_height: u32) -> Self {
        Self {
            state: ScanState::Idle,
            gap_threshold,
            min_block_height,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn emit(&self, start: u32, end: u32) -> Option<RowSpan> {
        let span = RowSpan::new(start, end);
        if span.len() >= self.min_block_height {
            Some(span)
        } else {
            trace!(start, end, "dropped short block");
            None
        }
    }

    /// Feed row `y`. Returns a block when this row closes one.
    pub fn feed(&mut self, y: u32, empty: bool) -> Option<RowSpan> {
        match (self.state, empty) {
            (ScanState::Idle, true) => None,
            (ScanState::Idle, false) => {
                self.state = ScanState::InBlock { start: y, gap: 0 };
                None
            }
            (ScanState::InBlock { start, .. }, false) => {
                self.state = ScanState::InBlock { start, gap: 0 };
                None
            }
            (ScanState::InBlock { start, gap }, true) => {
                let gap = gap + 1;
                if gap > self.gap_threshold {
                    self.state = ScanState::Idle;
                    // the block ends at the first row of the gap
                    self.emit(start, y + 1 - gap)
                } else {
                    self.state = ScanState::InBlock { start, gap };
                    None
                }
            }
        }
    }

    /// Close any open block at `end` (exclusive), trimming trailing empty
    /// rows.
    pub fn finish(&mut self, end: u32) -> Option<RowSpan> {
        match std::mem::replace(&mut self.state, ScanState::Idle) {
            ScanState::Idle => None,
            ScanState::InBlock { start, gap } => self.emit(start, end.saturating_sub(gap)),
        }
    }
}

/// Whether row `y` has too little ink to count as content.
pub fn row_is_empty(image: &RgbaImage, y: u32, options: &BlockScanOptions) -> bool {
    let step = options.sample_step.max(1) as usize;
    let mut samples = 0usize;
    let mut ink = 0usize;
    for x in (0..image.width()).step_by(step) {
        samples += 1;
        if options.ink.is_ink(image.get_pixel(x, y)) {
            ink += 1;
        }
    }
    (ink as f32) < samples as f32 * options.empty_row_ratio
}

/// Split a page into vertical content blocks separated by whitespace.
pub fn find_content_blocks(image: &RgbaImage, options: &BlockScanOptions) -> Vec<RowSpan> {
    let height = image.height();
    let first = options.skip_top.min(height);
    let last = height.saturating_sub(options.skip_bottom).max(first);

    let mut scanner = BlockScanner::new(options.gap_threshold, options.min_block_height);
    let mut blocks = Vec::new();
    for y in first..last {
        if let Some(span) = scanner.feed(y, row_is_empty(image, y, options)) {
            blocks.push(span);
        }
    }
    blocks.extend(scanner.finish(last));

    debug!(
        rows = last - first,
        blocks = blocks.len(),
        "scanned page for content blocks"
    );
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn page_with_bands(width: u32, height: u32, bands: &[(u32, u32)]) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        for &(top, bottom) in bands {
            for y in top..bottom {
                for x in 0..width / 2 {
                    img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                }
            }
        }
        img
    }

    fn feed_all(scanner: &mut BlockScanner, rows: &[bool]) -> Vec<RowSpan> {
        let mut out: Vec<RowSpan> = rows
            .iter()
            .enumerate()
            .filter_map(|(y, &empty)| scanner.feed(y as u32, empty))
            .collect();
        out.extend(scanner.finish(rows.len() as u32));
        out
    }

    #[test]
    fn automaton_closes_block_after_gap() {
        let mut scanner = BlockScanner::new(2, 1);
        // content at rows 1..3, gap of 3 closes it, content again at 6..8
        let rows = [true, false, false, true, true, true, false, false];
        let blocks = feed_all(&mut scanner, &rows);
        assert_eq!(blocks, vec![RowSpan::new(1, 3), RowSpan::new(6, 8)]);
    }

    #[test]
    fn short_gap_does_not_split() {
        let mut scanner = BlockScanner::new(2, 1);
        let rows = [false, true, true, false];
        assert_eq!(feed_all(&mut scanner, &rows), vec![RowSpan::new(0, 4)]);
    }

    #[test]
    fn state_transitions() {
        let mut scanner = BlockScanner::new(1, 1);
        assert_eq!(scanner.state(), ScanState::Idle);
        scanner.feed(0, false);
        assert_eq!(scanner.state(), ScanState::InBlock { start: 0, gap: 0 });
        scanner.feed(1, true);
        assert_eq!(scanner.state(), ScanState::InBlock { start: 0, gap: 1 });
        assert_eq!(scanner.feed(2, true), Some(RowSpan::new(0, 1)));
        assert_eq!(scanner.state(), ScanState::Idle);
    }

    #[test]
    fn finish_trims_trailing_gap() {
        let mut scanner = BlockScanner::new(10, 1);
        let rows = [false, false, true, true];
        assert_eq!(feed_all(&mut scanner, &rows), vec![RowSpan::new(0, 2)]);
    }

    #[test]
    fn finds_separated_blocks() {
        let img = page_with_bands(400, 600, &[(50, 150), (250, 400), (500, 520)]);
        let blocks = find_content_blocks(&img, &BlockScanOptions::default());
        // the 20-row band is shorter than the minimum height
        assert_eq!(blocks, vec![RowSpan::new(50, 150), RowSpan::new(250, 400)]);
    }

    #[test]
    fn skip_margins_hide_header() {
        let img = page_with_bands(400, 600, &[(0, 60), (200, 300)]);
        let options = BlockScanOptions {
            skip_top: 80,
            ..BlockScanOptions::default()
        };
        assert_eq!(find_content_blocks(&img, &options), vec![RowSpan::new(200, 300)]);
    }

    #[test]
    fn blank_page_has_no_blocks() {
        let img = page_with_bands(200, 200, &[]);
        assert!(find_content_blocks(&img, &BlockScanOptions::default()).is_empty());
    }

    #[test]
    fn sparse_specks_are_empty_rows() {
        let mut img = page_with_bands(1000, 10, &[]);
        // 2 ink samples out of 500 is below 1%
        img.put_pixel(0, 5, Rgba([0, 0, 0, 255]));
        img.put_pixel(2, 5, Rgba([0, 0, 0, 255]));
        assert!(row_is_empty(&img, 5, &BlockScanOptions::default()));
    }

    #[test]
    fn span_to_rect_applies_margin() {
        let rect = RowSpan::new(10, 90).to_rect(1754, 20);
        assert_eq!(rect, PixelRect::new(20, 10, 1734, 90));
        assert_eq!(RowSpan::new(0, 5).to_rect(10, 20), PixelRect::new(10, 0, 10, 5));
    }
}
