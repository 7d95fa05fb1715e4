//! Question-bank document model.
//!
//! The bank is nested as `Exam -> Subject -> Section -> Question`. Every
//! struct keeps the fields it does not know about in `extra`, so reading a
//! bank and writing it back never drops data the dashboard relies on.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::image_ref::ImageRef;

/// Stable question identifier.
///
/// Assigned once when a record is created and never renumbered afterwards.
/// Zero is reserved for "unassigned" and is reported by validation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

impl QuestionId {
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Question kind. Also names the section a question lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuestionType {
    #[default]
    #[serde(rename = "MCQ", alias = "mcq", alias = "Mcq")]
    Mcq,
    #[serde(
        rename = "Numerical",
        alias = "numerical",
        alias = "num",
        alias = "NUM",
        alias = "Num"
    )]
    Numerical,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "MCQ",
            QuestionType::Numerical => "Numerical",
        }
    }

    /// Parse the spellings found in existing banks and manifests.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcq" => Some(QuestionType::Mcq),
            "numerical" | "num" => Some(QuestionType::Numerical),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answer key entry: an option index, a numeric value, or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Index(i64),
    Value(f64),
    Text(String),
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Index(i) => write!(f, "{i}"),
            Answer::Value(v) => write!(f, "{v}"),
            Answer::Text(t) => f.write_str(t),
        }
    }
}

/// A single exam question.
///
/// Banks written by different tools disagree on which keys a question
/// carries: some write `"image": null`, some omit `answer` altogether.
/// [`Question`] remembers which of the optional keys it was read with and
/// writes back exactly those, plus any that have since gained a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuestionRecord", into = "QuestionRecord")]
pub struct Question {
    pub id: QuestionId,
    pub kind: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    pub answer: Option<Answer>,
    pub image: ImageRef,
    pub extra: Map<String, Value>,
    keys: StoredKeys,
}

/// Optional keys a question was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct StoredKeys {
    text: bool,
    options: bool,
    answer: bool,
    image: bool,
}

/// On-disk shape of a question. `None` means the key is absent, while
/// `Some(None)` is an explicit `null`.
#[derive(Serialize, Deserialize)]
struct QuestionRecord {
    #[serde(default)]
    id: QuestionId,
    #[serde(rename = "type", default)]
    kind: QuestionType,
    #[serde(default, alias = "questionText", skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    options: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    answer: Option<Option<Answer>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    image: Option<ImageRef>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl From<QuestionRecord> for Question {
    fn from(record: QuestionRecord) -> Self {
        let keys = StoredKeys {
            text: record.text.is_some(),
            options: record.options.is_some(),
            answer: record.answer.is_some(),
            image: record.image.is_some(),
        };
        Self {
            id: record.id,
            kind: record.kind,
            text: record.text.unwrap_or_default(),
            // `"options": null` appears in skeleton banks
            options: record.options.flatten().unwrap_or_default(),
            answer: record.answer.flatten(),
            image: record.image.unwrap_or_default(),
            extra: record.extra,
            keys,
        }
    }
}

impl From<Question> for QuestionRecord {
    fn from(q: Question) -> Self {
        let keys = q.keys;
        Self {
            id: q.id,
            kind: q.kind,
            text: (keys.text || !q.text.is_empty()).then_some(q.text),
            options: (keys.options || !q.options.is_empty()).then_some(Some(q.options)),
            answer: (keys.answer || q.answer.is_some()).then_some(q.answer),
            image: (keys.image || !q.image.is_none()).then_some(q.image),
            extra: q.extra,
        }
    }
}

impl Question {
    /// A fresh record. It is written with the full key set except `image`,
    /// which appears once one is attached.
    pub fn new(id: QuestionId, kind: QuestionType, text: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            text: text.into(),
            options: Vec::new(),
            answer: None,
            image: ImageRef::None,
            extra: Map::new(),
            keys: StoredKeys {
                text: true,
                options: true,
                answer: true,
                image: false,
            },
        }
    }
}

/// A section of one subject, holding questions of a single type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "name", alias = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    pub fn new(kind: QuestionType) -> Self {
        Self {
            kind,
            questions: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// One subject (Physics, Chemistry, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: Vec::new(),
            extra: Map::new(),
        }
    }

    /// The first section of `kind`, created at the end if missing.
    pub fn section_mut(&mut self, kind: QuestionType) -> &mut Section {
        let idx = match self.sections.iter().position(|s| s.kind == kind) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(kind));
                self.sections.len() - 1
            }
        };
        &mut self.sections[idx]
    }

    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }
}

/// A whole exam paper.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Exam {
    #[serde(rename = "examTitle", alias = "title", default)]
    pub title: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Exam {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subjects: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Subject by case-insensitive name.
    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Subject by case-insensitive name, created at the end if missing.
    pub fn subject_mut(&mut self, name: &str) -> &mut Subject {
        let idx = match self
            .subjects
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
        {
            Some(idx) => idx,
            None => {
                self.subjects.push(Subject::new(name));
                self.subjects.len() - 1
            }
        };
        &mut self.subjects[idx]
    }

    /// Every question in document order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.subjects
            .iter()
            .flat_map(|s| s.sections.iter())
            .flat_map(|s| s.questions.iter())
    }

    /// Every question in document order, mutably.
    pub fn questions_mut(&mut self) -> impl Iterator<Item = &mut Question> {
        self.subjects
            .iter_mut()
            .flat_map(|s| s.sections.iter_mut())
            .flat_map(|s| s.questions.iter_mut())
    }

    /// Every question with the name of its subject.
    pub fn questions_with_subject(&self) -> impl Iterator<Item = (&str, &Question)> {
        self.subjects.iter().flat_map(|subject| {
            subject
                .sections
                .iter()
                .flat_map(|s| s.questions.iter())
                .map(move |q| (subject.name.as_str(), q))
        })
    }

    pub fn question_count(&self) -> usize {
        self.subjects.iter().map(Subject::question_count).sum()
    }
}

/// Hands out fresh question ids, one past the highest id in use.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Start after the highest id already present in `exam`.
    pub fn for_exam(exam: &Exam) -> Self {
        let max = exam.questions().map(|q| q.id.0).max().unwrap_or(0);
        Self { next: max + 1 }
    }

    pub fn starting_at(first: u32) -> Self {
        Self {
            next: first.max(1),
        }
    }

    pub fn next_id(&mut self) -> QuestionId {
        let id = QuestionId(self.next);
        self.next += 1;
        id
    }

    /// Make sure `id` will never be handed out.
    pub fn reserve(&mut self, id: QuestionId) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}
