use std::path::Path;

use qbank_core::{DistributionPlan, distribute, summarize};

use crate::shared::{Context, load_bank, save_bank};

pub fn run(
    bank: &Path,
    subjects: &[String],
    per_subject: usize,
    mcq: usize,
    ctx: &Context,
) -> Result<(), i32> {
    let mut exam = load_bank(bank)?;
    let plan = DistributionPlan {
        subjects: subjects
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        per_subject,
        mcq_per_subject: mcq,
    };

    distribute(&mut exam, &plan).map_err(|e| {
        eprintln!("Error: {e}");
        1
    })?;
    save_bank(bank, &exam, ctx)?;
    println!("{}", summarize(&exam));
    Ok(())
}
