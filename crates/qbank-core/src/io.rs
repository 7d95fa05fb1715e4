//! Reading and writing question-bank JSON.
//!
//! Output is UTF-8 with non-ASCII characters kept as-is and a fixed indent.
//! Writes go to a temporary file in the destination directory which is then
//! renamed over the target, so an interrupted run leaves the previous file
//! untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::bank::Exam;
use crate::error::{BankError, BankResult};

/// Output formatting for JSON documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStyle {
    /// Spaces per indent level. Banks use 2, simulator exports use 4.
    pub indent: usize,
    /// Copy the existing file to `<name>.bak` before overwriting it.
    pub backup: bool,
}

impl Default for JsonStyle {
    fn default() -> Self {
        Self {
            indent: 2,
            backup: false,
        }
    }
}

impl JsonStyle {
    pub fn with_indent(indent: usize) -> Self {
        Self {
            indent,
            ..Self::default()
        }
    }
}

/// Read any JSON document.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> BankResult<T> {
    let text = fs::read_to_string(path).map_err(|e| BankError::io(path, e))?;
    // Files saved by some Windows editors start with a BOM.
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    serde_json::from_str(text).map_err(|e| BankError::json(path, e))
}

/// Read a question bank.
pub fn load_exam(path: &Path) -> BankResult<Exam> {
    let exam: Exam = load_json(path)?;
    debug!(
        path = %path.display(),
        subjects = exam.subjects.len(),
        questions = exam.question_count(),
        "loaded question bank"
    );
    Ok(exam)
}

/// Render a document the way it is written to disk.
pub fn to_json_string<T: Serialize>(value: &T, style: &JsonStyle) -> BankResult<String> {
    let indent = " ".repeat(style.indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).map_err(BankError::Serialize)?;
    buf.push(b'\n');
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write any JSON document atomically.
pub fn save_json<T: Serialize>(path: &Path, value: &T, style: &JsonStyle) -> BankResult<()> {
    let text = to_json_string(value, style)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| BankError::io(&dir, e))?;

    if style.backup && path.exists() {
        let backup = backup_path(path);
        fs::copy(path, &backup).map_err(|e| BankError::io(&backup, e))?;
        info!(backup = %backup.display(), "saved snapshot before overwrite");
    }

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| BankError::io(&dir, e))?;
    tmp.write_all(text.as_bytes())
        .map_err(|e| BankError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| BankError::io(path, e.error))?;
    debug!(path = %path.display(), bytes = text.len(), "wrote JSON");
    Ok(())
}

/// Write a question bank atomically.
pub fn save_exam(path: &Path, exam: &Exam, style: &JsonStyle) -> BankResult<()> {
    save_json(path, exam, style)
}

/// `bank.json` -> `bank.json.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{Question, QuestionId, QuestionType};

    fn exam() -> Exam {
        let mut exam = Exam::new("QFT 6");
        let mut q = Question::new(QuestionId(1), QuestionType::Mcq, "θ = π/4 → sin θ");
        q.options = vec!["1".into(), "2".into(), "3".into(), "4".into()];
        exam.subject_mut("Physics")
            .section_mut(QuestionType::Mcq)
            .questions
            .push(q);
        exam
    }

    #[test]
    fn non_ascii_is_preserved() {
        let text = to_json_string(&exam(), &JsonStyle::default()).unwrap();
        assert!(text.contains("θ = π/4 → sin θ"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn indent_is_configurable() {
        let two = to_json_string(&exam(), &JsonStyle::with_indent(2)).unwrap();
        let four = to_json_string(&exam(), &JsonStyle::with_indent(4)).unwrap();
        assert!(two.contains("\n  \"subjects\""));
        assert!(four.contains("\n    \"subjects\""));
        assert!(two.ends_with("}\n"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/bank.json");
        save_exam(&path, &exam(), &JsonStyle::default()).unwrap();
        let loaded = load_exam(&path).unwrap();
        assert_eq!(loaded, exam());
    }

    #[test]
    fn backup_snapshot_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");
        fs::write(&path, "{\"examTitle\": \"old\", \"subjects\": []}").unwrap();

        let style = JsonStyle {
            indent: 2,
            backup: true,
        };
        save_exam(&path, &exam(), &style).unwrap();

        let backup = fs::read_to_string(backup_path(&path)).unwrap();
        assert!(backup.contains("old"));
        assert_eq!(load_exam(&path).unwrap().title, "QFT 6");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_exam(Path::new("/nonexistent/bank.json")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn bom_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.json");
        fs::write(&path, "\u{feff}{\"examTitle\": \"x\", \"subjects\": []}").unwrap();
        assert_eq!(load_exam(&path).unwrap().title, "x");
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/data/qft_04.json")),
            PathBuf::from("/data/qft_04.json.bak")
        );
    }
}
