use std::path::Path;

use qbank_raster::PageRenderer;

use crate::shared::{Context, require_file, resolve_pages};

pub fn run(
    file: &Path,
    out: &Path,
    pages: Option<&str>,
    scale: Option<f32>,
    ctx: &Context,
) -> Result<(), i32> {
    require_file(file)?;
    let scale = scale.unwrap_or(ctx.config.render.scale);
    if scale.is_nan() || scale <= 0.0 {
        eprintln!("Error: scale must be positive, got {scale}");
        return Err(1);
    }

    let renderer = PageRenderer::new().map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    let page_count = renderer.page_count(file).map_err(|e| {
        eprintln!("Error: failed to open PDF: {e}");
        1
    })?;
    let page_indices = resolve_pages(pages, page_count)?;

    let rendered = renderer
        .render_pages(file, &page_indices, scale, out)
        .map_err(|e| {
            eprintln!("Error: {e}");
            1
        })?;
    for page in &rendered {
        println!(
            "page {:>3}  {}x{}  {}",
            page.number,
            page.width,
            page.height,
            page.path.display()
        );
    }
    println!("Rendered {} page(s) to {}", rendered.len(), out.display());
    Ok(())
}
