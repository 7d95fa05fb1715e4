use std::path::{Path, PathBuf};

use qbank_core::{
    DistributionPlan, Exam, IdAllocator, ImageRef, Question, QuestionType, distribute,
};
use qbank_raster::{BlockScanOptions, crop_to, find_content_blocks, load_image, save_png};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::shared::{Context, ProgressReporter, public_path, save_bank};

const MCQ_LABELS: [&str; 4] = ["A", "B", "C", "D"];

/// Command-line overrides of the `[detect.blocks]` settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOverrides {
    pub gap: Option<u32>,
    pub min_height: Option<u32>,
    pub skip_top: Option<u32>,
    pub skip_bottom: Option<u32>,
}

impl ScanOverrides {
    fn apply(self, mut options: BlockScanOptions) -> BlockScanOptions {
        if let Some(gap) = self.gap {
            options.gap_threshold = gap;
        }
        if let Some(height) = self.min_height {
            options.min_block_height = height;
        }
        if let Some(rows) = self.skip_top {
            options.skip_top = rows;
        }
        if let Some(rows) = self.skip_bottom {
            options.skip_bottom = rows;
        }
        options
    }
}

/// Trailing number of a file stem: `page_12` -> 12.
fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    stem[stem.len() - digits..].parse().ok()
}

/// Page images directly inside `dir`, in page order (page_2 before page_10).
pub fn page_images(dir: &Path) -> Vec<PathBuf> {
    let mut pages: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        })
        .collect();
    pages.sort_by(|a, b| (page_number(a), a).cmp(&(page_number(b), b)));
    pages
}

pub fn run(
    dir: &Path,
    out: &Path,
    bank: Option<&Path>,
    title: &str,
    overrides: ScanOverrides,
    ctx: &Context,
) -> Result<(), i32> {
    if !dir.is_dir() {
        eprintln!("Error: directory not found: {}", dir.display());
        return Err(1);
    }
    let pages = page_images(dir);
    if pages.is_empty() {
        eprintln!("Error: no page images in {}", dir.display());
        return Err(1);
    }

    let options = overrides.apply(ctx.config.detect.blocks.clone());
    let x_margin = ctx.config.detect.x_margin;
    debug!(?options, x_margin, "segmenting");

    let mut ids = IdAllocator::starting_at(1);
    let mut questions = Vec::new();
    let progress = ProgressReporter::new("page", pages.len());

    for (i, page) in pages.iter().enumerate() {
        progress.report(i + 1);
        let image = load_image(page).map_err(|e| {
            progress.finish();
            eprintln!("Error: {e}");
            1
        })?;
        let blocks = find_content_blocks(&image, &options);
        info!(page = %page.display(), blocks = blocks.len(), "segmented page");

        for block in blocks {
            let id = ids.next_id();
            let path = out.join(format!("q{:03}.png", id.0));
            let crop = crop_to(&image, block.to_rect(image.width(), x_margin));
            let saved = crop.and_then(|crop| save_png(&crop, &path));
            if let Err(e) = saved {
                progress.finish();
                eprintln!("Error: {e}");
                return Err(1);
            }
            debug!(%id, start = block.start, end = block.end, "saved question crop");

            let mut question = Question::new(id, QuestionType::Mcq, "");
            question.image = ImageRef::Diagram {
                path: public_path(&ctx.paths, &path),
                source_page: Some(public_path(&ctx.paths, page)),
            };
            questions.push(question);
        }
    }
    progress.finish();
    println!(
        "Extracted {} question(s) from {} page(s) into {}",
        questions.len(),
        pages.len(),
        out.display()
    );

    if let Some(bank) = bank {
        let exam = skeleton_bank(title, questions)?;
        save_bank(bank, &exam, ctx)?;
        println!("Wrote skeleton bank {}", bank.display());
    }
    Ok(())
}

/// Group the crops with the default paper layout and give MCQs placeholder
/// option labels.
fn skeleton_bank(title: &str, questions: Vec<Question>) -> Result<Exam, i32> {
    let plan = DistributionPlan::default();
    let mut exam = Exam::new(title);
    let Some(first) = plan.subjects.first() else {
        return Ok(exam);
    };
    exam.subject_mut(first)
        .section_mut(QuestionType::Mcq)
        .questions = questions;

    distribute(&mut exam, &plan).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    for question in exam.questions_mut() {
        if question.kind == QuestionType::Mcq && question.options.is_empty() {
            question.options = MCQ_LABELS.iter().map(|s| s.to_string()).collect();
        }
    }
    Ok(exam)
}
