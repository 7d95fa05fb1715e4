use std::path::Path;

use qbank_core::{Severity, summarize, validate_exam};

use crate::cli::ReportFormat;
use crate::shared::{load_bank, print_json};

/// Exit code when the bank has errors.
pub const EXIT_INVALID: i32 = 2;

pub fn run(bank: &Path, format: &ReportFormat) -> Result<(), i32> {
    let exam = load_bank(bank)?;
    let issues = validate_exam(&exam);

    let error_count = issues.iter().filter(|i| i.is_error()).count();
    let warning_count = issues.iter().filter(|i| i.is_warning()).count();

    match format {
        ReportFormat::Text => {
            println!("{}", summarize(&exam));
            println!();
            if issues.is_empty() {
                println!("No issues found.");
            } else {
                for issue in &issues {
                    let severity = match issue.severity {
                        Severity::Error => "ERROR",
                        Severity::Warning => "WARNING",
                    };
                    print!("[{severity}] {}: {}", issue.code, issue.message);
                    if let Some(ref loc) = issue.location {
                        print!(" (at {loc})");
                    }
                    println!();
                }
                println!();
                println!("Summary: {error_count} error(s), {warning_count} warning(s)");
            }
        }
        ReportFormat::Json => {
            let summary = summarize(&exam);
            let subjects: Vec<serde_json::Value> = summary
                .subjects
                .iter()
                .map(|s| {
                    let sections: serde_json::Map<String, serde_json::Value> = s
                        .sections
                        .iter()
                        .map(|(kind, count)| (kind.to_string(), serde_json::json!(count)))
                        .collect();
                    serde_json::json!({
                        "name": s.name,
                        "questions": s.total(),
                        "with_images": s.with_images,
                        "sections": sections,
                    })
                })
                .collect();
            let issues_json: Vec<serde_json::Value> = issues
                .iter()
                .map(|issue| {
                    let mut obj = serde_json::json!({
                        "severity": issue.severity.to_string(),
                        "code": issue.code,
                        "message": issue.message,
                    });
                    if let Some(ref loc) = issue.location {
                        obj["location"] = serde_json::json!(loc);
                    }
                    obj
                })
                .collect();

            print_json(&serde_json::json!({
                "title": summary.title,
                "total": summary.total(),
                "subjects": subjects,
                "issues": issues_json,
                "summary": {
                    "errors": error_count,
                    "warnings": warning_count,
                },
            }))?;
        }
    }

    if error_count > 0 {
        return Err(EXIT_INVALID);
    }
    Ok(())
}
