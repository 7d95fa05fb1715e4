use std::path::Path;

use qbank_core::{IdAllocator, Question, QuestionType, append};

use crate::shared::{Context, load_bank, read_document, save_bank};

pub fn run(
    bank: &Path,
    drafts: &Path,
    subject: &str,
    section: QuestionType,
    ctx: &Context,
) -> Result<(), i32> {
    let mut exam = load_bank(bank)?;
    let drafts: Vec<Question> = read_document(drafts)?;
    if drafts.is_empty() {
        eprintln!("Error: no questions in drafts file");
        return Err(1);
    }

    let mut ids = IdAllocator::for_exam(&exam);
    let report = append(&mut exam, subject, section, drafts, &mut ids);
    save_bank(bank, &exam, ctx)?;

    let first = report.ids.first().map(|id| id.0).unwrap_or_default();
    let last = report.ids.last().map(|id| id.0).unwrap_or_default();
    println!(
        "Appended {} question(s) to {subject}/{section} (ids {first}..={last})",
        report.ids.len()
    );
    if report.reassigned > 0 {
        println!("  {} draft(s) got a fresh id", report.reassigned);
    }
    Ok(())
}
