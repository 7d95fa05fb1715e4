use std::io::{self, IsTerminal, Write};
use std::path::Path;

use qbank_core::{Exam, JsonStyle, PathConfig, load_exam, load_json, save_exam};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::page_range::parse_page_range;

/// Indent used for question banks.
pub const BANK_INDENT: usize = 2;
/// Indent used for simulator exports.
pub const EXPORT_INDENT: usize = 4;

/// Settings every subcommand sees: the loaded config plus global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub paths: PathConfig,
    pub backup: bool,
}

impl Context {
    pub fn style(&self, indent: usize) -> JsonStyle {
        JsonStyle {
            indent,
            backup: self.backup,
        }
    }
}

/// Fail with a message on stderr when `file` does not exist.
pub fn require_file(file: &Path) -> Result<(), i32> {
    if file.is_file() {
        Ok(())
    } else {
        eprintln!("Error: file not found: {}", file.display());
        Err(1)
    }
}

/// Load a question bank with user-friendly error messages.
pub fn load_bank(file: &Path) -> Result<Exam, i32> {
    require_file(file)?;
    load_exam(file).map_err(|e| {
        eprintln!("Error: failed to load bank: {e}");
        1
    })
}

pub fn save_bank(file: &Path, exam: &Exam, ctx: &Context) -> Result<(), i32> {
    save_exam(file, exam, &ctx.style(BANK_INDENT)).map_err(|e| {
        eprintln!("Error: failed to save bank: {e}");
        1
    })
}

/// Read a side file (drafts, assignments, answers) as TOML when it ends in
/// `.toml`, JSON otherwise.
pub fn read_document<T: DeserializeOwned>(file: &Path) -> Result<T, i32> {
    require_file(file)?;
    let is_toml = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        let text = std::fs::read_to_string(file).map_err(|e| {
            eprintln!("Error: failed to read {}: {e}", file.display());
            1
        })?;
        toml::from_str(&text).map_err(|e| {
            eprintln!("Error: invalid TOML in {}: {e}", file.display());
            1
        })
    } else {
        load_json(file).map_err(|e| {
            eprintln!("Error: {e}");
            1
        })
    }
}

/// Path of a file as stored in a bank: `/questions/q001.png` when it lies
/// inside the public directory, the plain path otherwise.
pub fn public_path(paths: &PathConfig, path: &Path) -> String {
    match paths.to_public(path) {
        Some(rel) => format!("/{rel}"),
        None => path.display().to_string(),
    }
}

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), i32> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        eprintln!("Error: failed to serialize output: {e}");
        1
    })?;
    println!("{text}");
    Ok(())
}

/// Resolve an optional page range string into 0-indexed page indices.
///
/// If `pages` is `None`, returns all pages (0..page_count).
pub fn resolve_pages(pages: Option<&str>, page_count: usize) -> Result<Vec<usize>, i32> {
    match pages {
        Some(range) => parse_page_range(range, page_count).map_err(|e| {
            eprintln!("Error: {e}");
            1
        }),
        None => Ok((0..page_count).collect()),
    }
}

/// Prints "Processing <what> N/M..." to stderr, but only when stderr is a
/// terminal.
pub struct ProgressReporter {
    what: &'static str,
    total: usize,
    is_tty: bool,
}

impl ProgressReporter {
    pub fn new(what: &'static str, total: usize) -> Self {
        Self {
            what,
            total,
            is_tty: io::stderr().is_terminal(),
        }
    }

    /// Report progress for item `current` (1-indexed).
    pub fn report(&self, current: usize) {
        if self.is_tty {
            eprint!("\rProcessing {} {}/{}...", self.what, current, self.total);
            let _ = io::stderr().flush();
        }
    }

    /// Clear the progress line (if TTY).
    pub fn finish(&self) {
        if self.is_tty {
            eprint!("\r{}\r", " ".repeat(40));
            let _ = io::stderr().flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_bank_file_not_found() {
        assert_eq!(load_bank(Path::new("/nonexistent/bank.json")).unwrap_err(), 1);
    }

    #[test]
    fn resolve_pages_none_returns_all() {
        assert_eq!(resolve_pages(None, 3).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn resolve_pages_invalid_range() {
        assert_eq!(resolve_pages(Some("0"), 5).unwrap_err(), 1);
    }

    #[test]
    fn read_document_by_extension() {
        #[derive(serde::Deserialize)]
        struct Doc {
            name: String,
        }
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("doc.toml");
        let json_path = dir.path().join("doc.json");
        std::fs::write(&toml_path, "name = \"physics\"").unwrap();
        std::fs::write(&json_path, r#"{"name": "chemistry"}"#).unwrap();

        assert_eq!(read_document::<Doc>(&toml_path).unwrap().name, "physics");
        assert_eq!(read_document::<Doc>(&json_path).unwrap().name, "chemistry");
    }

    #[test]
    fn context_style_carries_backup() {
        let ctx = Context {
            config: Config::default(),
            paths: PathConfig::default(),
            backup: true,
        };
        let style = ctx.style(EXPORT_INDENT);
        assert_eq!(style.indent, 4);
        assert!(style.backup);
    }

    #[test]
    fn public_paths_are_rooted() {
        let paths = PathConfig::new("site/public");
        assert_eq!(
            public_path(&paths, Path::new("site/public/questions/q001.png")),
            "/questions/q001.png"
        );
        assert_eq!(public_path(&paths, Path::new("elsewhere/q.png")), "elsewhere/q.png");
    }

    #[test]
    fn progress_reporter_creation() {
        let reporter = ProgressReporter::new("page", 10);
        assert_eq!(reporter.total, 10);
    }
}
