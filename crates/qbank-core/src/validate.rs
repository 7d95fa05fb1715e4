//! Consistency checks over a question bank.
//!
//! [`validate_exam`] never modifies the bank. It returns every problem it
//! finds so the operator can fix the source data and rerun.

use std::collections::HashMap;
use std::fmt;

use crate::bank::{Exam, QuestionId, QuestionType};

/// How serious a validation issue is.
///
/// Errors break the dashboard (lookups by id, option rendering); warnings
/// flag records that load but probably need attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A problem found in a question bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Machine-readable code (e.g. "DUPLICATE_ID", "EMPTY_TEXT").
    pub code: String,
    pub message: String,
    /// Where in the bank, e.g. "Physics/MCQ #3".
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::new(severity, code, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)?;
        if let Some(ref loc) = self.location {
            write!(f, " (at {loc})")?;
        }
        Ok(())
    }
}

/// Number of options an MCQ carries.
pub const MCQ_OPTION_COUNT: usize = 4;

/// Check every question in `exam`.
///
/// Errors: unassigned id (0), an option list that is neither empty nor
/// four long, an id used more than once within a subject or across the
/// whole bank. Warnings: empty text, an MCQ with no options, a question whose
/// type differs from its section.
pub fn validate_exam(exam: &Exam) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen: HashMap<QuestionId, String> = HashMap::new();

    if exam.subjects.is_empty() {
        issues.push(ValidationIssue::new(
            Severity::Warning,
            "NO_SUBJECTS",
            "exam has no subjects",
        ));
    }

    for subject in &exam.subjects {
        for section in &subject.sections {
            for (index, q) in section.questions.iter().enumerate() {
                let at = format!("{}/{} #{}", subject.name, section.kind, index + 1);

                if !q.id.is_assigned() {
                    issues.push(ValidationIssue::with_location(
                        Severity::Error,
                        "MISSING_ID",
                        "question has no id",
                        &at,
                    ));
                } else if let Some(first) = seen.get(&q.id) {
                    issues.push(ValidationIssue::with_location(
                        Severity::Error,
                        "DUPLICATE_ID",
                        format!("id {} already used at {first}", q.id),
                        &at,
                    ));
                } else {
                    seen.insert(q.id, at.clone());
                }

                let n = q.options.len();
                if n != 0 && n != MCQ_OPTION_COUNT {
                    issues.push(ValidationIssue::with_location(
                        Severity::Error,
                        "OPTION_COUNT",
                        format!("question {} has {n} options, expected 0 or {MCQ_OPTION_COUNT}", q.id),
                        &at,
                    ));
                }

                if q.text.trim().is_empty() {
                    issues.push(ValidationIssue::with_location(
                        Severity::Warning,
                        "EMPTY_TEXT",
                        format!("question {} has no text", q.id),
                        &at,
                    ));
                }

                if q.kind == QuestionType::Mcq && n == 0 {
                    issues.push(ValidationIssue::with_location(
                        Severity::Warning,
                        "MCQ_NO_OPTIONS",
                        format!("MCQ {} has no options", q.id),
                        &at,
                    ));
                }

                if q.kind != section.kind {
                    issues.push(ValidationIssue::with_location(
                        Severity::Warning,
                        "TYPE_MISMATCH",
                        format!("question {} is {} in a {} section", q.id, q.kind, section.kind),
                        &at,
                    ));
                }
            }
        }
    }
    issues
}

/// Question counts per subject and section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankSummary {
    pub title: String,
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSummary {
    pub name: String,
    pub sections: Vec<(QuestionType, usize)>,
    /// Questions with any image attached.
    pub with_images: usize,
}

impl SubjectSummary {
    pub fn total(&self) -> usize {
        self.sections.iter().map(|(_, n)| n).sum()
    }
}

impl BankSummary {
    pub fn total(&self) -> usize {
        self.subjects.iter().map(SubjectSummary::total).sum()
    }
}

impl fmt::Display for BankSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for subject in &self.subjects {
            writeln!(
                f,
                "  {}: {} questions ({} with images)",
                subject.name,
                subject.total(),
                subject.with_images
            )?;
            for (kind, count) in &subject.sections {
                writeln!(f, "    {kind}: {count}")?;
            }
        }
        write!(f, "Total: {}", self.total())
    }
}

pub fn summarize(exam: &Exam) -> BankSummary {
    BankSummary {
        title: exam.title.clone(),
        subjects: exam
            .subjects
            .iter()
            .map(|subject| SubjectSummary {
                name: subject.name.clone(),
                sections: subject
                    .sections
                    .iter()
                    .map(|s| (s.kind, s.questions.len()))
                    .collect(),
                with_images: subject
                    .sections
                    .iter()
                    .flat_map(|s| s.questions.iter())
                    .filter(|q| !q.image.is_none())
                    .count(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Question;
    use crate::image_ref::ImageRef;

    fn mcq(id: u32, text: &str) -> Question {
        let mut q = Question::new(QuestionId(id), QuestionType::Mcq, text);
        q.options = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        q
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn clean_bank_has_no_issues() {
        let mut exam = Exam::new("QFT 4");
        let physics = exam.subject_mut("Physics");
        physics.section_mut(QuestionType::Mcq).questions.push(mcq(1, "a"));
        physics
            .section_mut(QuestionType::Numerical)
            .questions
            .push(Question::new(QuestionId(2), QuestionType::Numerical, "b"));
        assert!(validate_exam(&exam).is_empty());
    }

    #[test]
    fn reports_errors_and_warnings() {
        let mut exam = Exam::new("QFT 6");
        let section = &mut exam.subject_mut("Chemistry").section_mut(QuestionType::Mcq).questions;
        section.push(mcq(0, "no id"));
        section.push(mcq(5, "first"));
        section.push(mcq(5, "again"));
        let mut three = mcq(6, "three options");
        three.options.pop();
        section.push(three);
        section.push(mcq(7, "  "));
        section.push(Question::new(QuestionId(8), QuestionType::Mcq, "bare"));
        section.push(Question::new(QuestionId(9), QuestionType::Numerical, "wrong section"));

        let issues = validate_exam(&exam);
        assert_eq!(
            codes(&issues),
            vec![
                "MISSING_ID",
                "DUPLICATE_ID",
                "OPTION_COUNT",
                "EMPTY_TEXT",
                "MCQ_NO_OPTIONS",
                "TYPE_MISMATCH"
            ]
        );
        assert_eq!(issues.iter().filter(|i| i.is_error()).count(), 3);
        assert_eq!(
            issues[1].to_string(),
            "[error] DUPLICATE_ID: id 5 already used at Chemistry/MCQ #2 (at Chemistry/MCQ #3)"
        );
    }

    #[test]
    fn duplicate_ids_across_subjects_are_errors() {
        let mut exam = Exam::new("QFT 4");
        exam.subject_mut("Physics")
            .section_mut(QuestionType::Mcq)
            .questions
            .push(mcq(1, "p"));
        exam.subject_mut("Chemistry")
            .section_mut(QuestionType::Mcq)
            .questions
            .push(mcq(1, "c"));
        let issues = validate_exam(&exam);
        assert_eq!(codes(&issues), vec!["DUPLICATE_ID"]);
    }

    #[test]
    fn empty_exam_warns() {
        let issues = validate_exam(&Exam::new("blank"));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_warning());
    }

    #[test]
    fn summary_counts() {
        let mut exam = Exam::new("QFT 4");
        let physics = exam.subject_mut("Physics");
        let mut with_image = mcq(1, "a");
        with_image.image = ImageRef::diagram("d.png");
        physics.section_mut(QuestionType::Mcq).questions.push(with_image);
        physics.section_mut(QuestionType::Mcq).questions.push(mcq(2, "b"));
        physics
            .section_mut(QuestionType::Numerical)
            .questions
            .push(Question::new(QuestionId(3), QuestionType::Numerical, "c"));

        let summary = summarize(&exam);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.subjects[0].with_images, 1);
        assert_eq!(
            summary.to_string(),
            "QFT 4\n  Physics: 3 questions (1 with images)\n    MCQ: 2\n    Numerical: 1\nTotal: 3"
        );
    }
}
