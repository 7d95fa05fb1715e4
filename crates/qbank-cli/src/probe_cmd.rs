use std::path::Path;

use qbank_raster::probe_pdf;

use crate::cli::ReportFormat;
use crate::shared::{print_json, require_file};

pub fn run(file: &Path, format: &ReportFormat) -> Result<(), i32> {
    require_file(file)?;
    let probe = probe_pdf(file).map_err(|e| {
        eprintln!("Error: failed to read PDF: {e}");
        1
    })?;

    match format {
        ReportFormat::Text => {
            for page in &probe.pages {
                let layer = if page.has_text_layer { "text" } else { "scan" };
                println!("page {:>3}  {layer:<4}  {:>6} chars", page.number, page.text_chars);
            }
            println!();
            match probe.first_text_page() {
                Some(page) => println!(
                    "{} pages; text layer from page {}",
                    probe.page_count(),
                    page.number
                ),
                None => println!(
                    "{} pages; no text layer, render and crop the page images",
                    probe.page_count()
                ),
            }
        }
        ReportFormat::Json => {
            let output = serde_json::json!({
                "pages": probe.pages,
                "page_count": probe.page_count(),
                "scanned": probe.is_scanned(),
            });
            print_json(&output)?;
        }
    }
    Ok(())
}
