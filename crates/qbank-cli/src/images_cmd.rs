use std::path::Path;

use qbank_core::{check_images, prune_missing};

use crate::shared::{Context, load_bank, save_bank};

/// Exit code when referenced images are missing and were not pruned.
pub const EXIT_MISSING: i32 = 2;

pub fn run(bank: &Path, prune: bool, ctx: &Context) -> Result<(), i32> {
    let mut exam = load_bank(bank)?;
    let issues = check_images(&exam, &ctx.paths);

    for issue in &issues {
        println!("{issue}");
    }
    if issues.is_empty() {
        println!("All referenced images present under {}", ctx.paths.public_dir.display());
        return Ok(());
    }

    if !prune {
        println!();
        println!("{} problem image(s); rerun with --prune to drop them", issues.len());
        return Err(EXIT_MISSING);
    }

    let removed = prune_missing(&mut exam, &ctx.paths);
    save_bank(bank, &exam, ctx)?;
    println!();
    println!("Removed {removed} image reference(s)");
    Ok(())
}
