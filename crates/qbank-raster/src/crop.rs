//! Cutting regions out of page images and writing them to disk.

use std::fs;
use std::path::Path;

use image::{DynamicImage, GenericImage, GenericImageView, ImageFormat, Rgb, RgbImage, RgbaImage};
use tracing::{debug, info};

use crate::error::{RasterError, RasterResult};
use qbank_core::PixelRect;

/// Open an image file as RGBA.
pub fn load_image(path: &Path) -> RasterResult<RgbaImage> {
    if !path.is_file() {
        return Err(RasterError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "image not found"),
        ));
    }
    let img = image::open(path)?;
    debug!(path = %path.display(), width = img.width(), height = img.height(), "loaded image");
    Ok(img.to_rgba8())
}

/// Copy `rect` out of `image`. The rect is clamped to the image first; an
/// empty result is an error.
pub fn crop_to(image: &RgbaImage, rect: PixelRect) -> RasterResult<RgbaImage> {
    let rect = rect.clamped(image.width(), image.height());
    if rect.is_empty() {
        return Err(RasterError::Geometry(format!(
            "crop {rect} is empty inside a {}x{} image",
            image.width(),
            image.height()
        )));
    }
    Ok(image
        .view(rect.left, rect.top, rect.width(), rect.height())
        .to_image())
}

/// Stack `parts` top to bottom on a white canvas as wide as the widest part.
/// Narrower parts are left-aligned.
pub fn stitch_vertical(parts: &[RgbaImage]) -> RasterResult<RgbImage> {
    if parts.is_empty() {
        return Err(RasterError::Geometry("nothing to stitch".to_string()));
    }
    let width = parts.iter().map(|p| p.width()).max().unwrap_or(0);
    let height: u32 = parts.iter().map(|p| p.height()).sum();

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut y = 0;
    for part in parts {
        let rgb = DynamicImage::ImageRgba8(part.clone()).to_rgb8();
        canvas
            .copy_from(&rgb, 0, y)
            .map_err(RasterError::Image)?;
        y += part.height();
    }
    debug!(parts = parts.len(), width, height, "stitched image");
    Ok(canvas)
}

/// Write a PNG, creating parent directories.
pub fn save_png<I: PngEncodable>(image: &I, path: &Path) -> RasterResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| RasterError::io(dir, e))?;
    }
    image.save_as_png(path)?;
    info!(path = %path.display(), "saved image");
    Ok(())
}

/// Image buffers [`save_png`] knows how to encode.
pub trait PngEncodable {
    fn save_as_png(&self, path: &Path) -> Result<(), image::ImageError>;
}

impl PngEncodable for RgbaImage {
    fn save_as_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.save_with_format(path, ImageFormat::Png)
    }
}

impl PngEncodable for RgbImage {
    fn save_as_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.save_with_format(path, ImageFormat::Png)
    }
}
