use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use qbank_core::{DiagramRef, PathConfig, SimulatorExport, embed_images, save_json, to_simulator};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::shared::{Context, EXPORT_INDENT, load_bank};

/// First directory of every image path the export references, e.g.
/// `qft4_images` for `/qft4_images/diagrams/q3.png`.
fn image_roots(export: &SimulatorExport) -> BTreeSet<String> {
    let diagram_paths = export.questions.iter().filter_map(|q| match &q.diagram {
        Some(DiagramRef::Path(path)) if !path.starts_with("data:") => Some(path.as_str()),
        _ => None,
    });
    let source_pages = export.questions.iter().filter_map(|q| q.source_page.as_deref());

    diagram_paths
        .chain(source_pages)
        .filter_map(|path| {
            let mut parts = path
                .trim_start_matches(['/', '\\'])
                .split(['/', '\\'])
                .filter(|p| !p.is_empty());
            let first = parts.next()?;
            // a bare file name has no directory to copy
            parts.next().map(|_| first.to_string())
        })
        .collect()
}

fn copy_tree(from: &Path, to: &Path) -> Result<usize, String> {
    let mut copied = 0;
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| e.to_string())?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| e.to_string())?;
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| format!("failed to create {}: {e}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|e| format!("failed to copy {}: {e}", entry.path().display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy each referenced image directory into `dest`. A directory that
/// already exists in `dest` is left alone.
fn copy_images(export: &SimulatorExport, paths: &PathConfig, dest: &Path) -> Result<(), i32> {
    for root in image_roots(export) {
        let from = paths.resolve_public(&root);
        let to: PathBuf = dest.join(&root);
        if !from.is_dir() {
            println!("  {} not found, nothing to copy", from.display());
            continue;
        }
        if to.exists() {
            println!("  {} already exists, not copying", to.display());
            continue;
        }
        let copied = copy_tree(&from, &to).map_err(|e| {
            eprintln!("Error: {e}");
            1
        })?;
        debug!(from = %from.display(), to = %to.display(), copied, "copied images");
        println!("  copied {copied} file(s) to {}", to.display());
    }
    Ok(())
}

pub fn run(
    bank: &Path,
    out: &Path,
    embed: bool,
    copy_to: Option<&Path>,
    ctx: &Context,
) -> Result<(), i32> {
    let exam = load_bank(bank)?;
    let mut export = to_simulator(&exam);

    if embed {
        let report = embed_images(&mut export, &ctx.paths).map_err(|e| {
            eprintln!("Error: {e}");
            1
        })?;
        println!(
            "Embedded {} image(s), {} missing",
            report.embedded, report.missing
        );
    }

    save_json(out, &export, &ctx.style(EXPORT_INDENT)).map_err(|e| {
        eprintln!("Error: failed to write export: {e}");
        1
    })?;
    info!(out = %out.display(), questions = export.questions.len(), "wrote export");

    println!("Exported \"{}\" to {}", export.title, out.display());
    for (subject, count) in export.subject_counts() {
        println!("  {subject}: {count}");
    }
    println!("  Total: {}", export.questions.len());

    if let Some(dest) = copy_to {
        copy_images(&export, &ctx.paths, dest)?;
    }
    Ok(())
}
