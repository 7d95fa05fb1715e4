use std::path::{Path, PathBuf};

use qbank_raster::{load_image, save_png, stitch_vertical};

use crate::shared::require_file;

pub fn run(parts: &[PathBuf], out: &Path) -> Result<(), i32> {
    let mut images = Vec::with_capacity(parts.len());
    for part in parts {
        require_file(part)?;
        images.push(load_image(part).map_err(|e| {
            eprintln!("Error: {e}");
            1
        })?);
    }

    let stitched = stitch_vertical(&images).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    save_png(&stitched, out).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    println!(
        "Stitched {} image(s) into {} ({}x{})",
        images.len(),
        out.display(),
        stitched.width(),
        stitched.height()
    );
    Ok(())
}
