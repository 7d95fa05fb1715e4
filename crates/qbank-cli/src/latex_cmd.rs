use std::path::Path;

use qbank_core::{LatexPass, apply_to_exam};

use crate::shared::{Context, load_bank, save_bank};

pub fn run(bank: &Path, pass: LatexPass, dry_run: bool, ctx: &Context) -> Result<(), i32> {
    let mut exam = load_bank(bank)?;
    let report = apply_to_exam(&mut exam, pass).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;

    if dry_run {
        println!(
            "Would rewrite {} of {} string(s)",
            report.strings_changed, report.strings_seen
        );
        return Ok(());
    }
    if report.strings_changed > 0 {
        save_bank(bank, &exam, ctx)?;
    }
    println!(
        "Rewrote {} of {} string(s)",
        report.strings_changed, report.strings_seen
    );
    Ok(())
}
