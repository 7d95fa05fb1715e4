//! Flat "standalone simulator" export.
//!
//! The simulator reads one list of questions with the subject repeated on
//! every entry, instead of the nested bank. Exporting never modifies the
//! source bank.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bank::{Answer, Exam, QuestionId, QuestionType};
use crate::geometry::CropRect;
use crate::image_ref::ImageRef;

/// Suffix appended to the exam title in exported files.
pub const STANDALONE_SUFFIX: &str = " (Standalone)";

/// What the simulator shows as the question's figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagramRef {
    /// A file path relative to the public directory, or a `data:` URL.
    Path(String),
    /// A region of `sourcePage` to show.
    Region(CropRect),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimQuestion {
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub question_text: String,
    pub options: Vec<String>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<DiagramRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorExport {
    pub title: String,
    pub questions: Vec<SimQuestion>,
}

impl SimulatorExport {
    /// Question count per subject, in first-seen order.
    pub fn subject_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for q in &self.questions {
            match counts.iter_mut().find(|(name, _)| *name == q.subject) {
                Some((_, n)) => *n += 1,
                None => counts.push((q.subject.clone(), 1)),
            }
        }
        counts
    }
}

fn diagram_of(image: &ImageRef) -> Option<DiagramRef> {
    match image {
        ImageRef::None | ImageRef::SourcePage(_) => None,
        ImageRef::Diagram { path, .. } => Some(DiagramRef::Path(path.clone())),
        ImageRef::Cropped { crop, diagram, .. } => Some(match diagram {
            Some(path) => DiagramRef::Path(path.clone()),
            None => DiagramRef::Region(*crop),
        }),
    }
}

/// Flatten a bank into the simulator format.
pub fn to_simulator(exam: &Exam) -> SimulatorExport {
    let questions: Vec<SimQuestion> = exam
        .questions_with_subject()
        .map(|(subject, q)| SimQuestion {
            id: q.id,
            kind: q.kind,
            question_text: q.text.clone(),
            options: q.options.clone(),
            subject: subject.to_string(),
            answer: q.answer.clone(),
            diagram: diagram_of(&q.image),
            source_page: q.image.source_page().map(str::to_string),
        })
        .collect();

    info!(questions = questions.len(), "built simulator export");
    SimulatorExport {
        title: format!("{}{STANDALONE_SUFFIX}", exam.title),
        questions,
    }
}
