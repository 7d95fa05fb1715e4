use std::path::Path;

use qbank_core::{ImageAssignment, attach_images};
use serde::Deserialize;

use crate::shared::{Context, load_bank, read_document, save_bank};

/// Assignments file: a bare JSON array, or a document with `[[image]]`
/// tables.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AssignmentFile {
    List(Vec<ImageAssignment>),
    Tables {
        #[serde(rename = "image")]
        images: Vec<ImageAssignment>,
    },
}

impl AssignmentFile {
    fn into_vec(self) -> Vec<ImageAssignment> {
        match self {
            AssignmentFile::List(list) | AssignmentFile::Tables { images: list } => list,
        }
    }
}

pub fn run(bank: &Path, assignments: &Path, ctx: &Context) -> Result<(), i32> {
    let mut exam = load_bank(bank)?;
    let assignments = read_document::<AssignmentFile>(assignments)?.into_vec();

    let report = attach_images(&mut exam, &assignments);
    save_bank(bank, &exam, ctx)?;

    println!("Attached {} of {} image(s)", report.attached, assignments.len());
    for id in &report.unmatched {
        println!("  no question {id}");
    }
    Ok(())
}
