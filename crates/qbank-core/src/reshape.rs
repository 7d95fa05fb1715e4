//! Structural edits to a question bank.
//!
//! None of these functions renumber existing questions. Ids are assigned
//! once, when [`append`] adds a record, and are the key every later edit
//! ([`attach_images`], [`set_answers`]) looks questions up by.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::bank::{Answer, Exam, IdAllocator, Question, QuestionId, QuestionType, Subject};
use crate::error::{BankError, BankResult};
use crate::image_ref::ImageRef;

/// How [`distribute`] regroups a flat list of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionPlan {
    /// Subject names in the order they appear in the paper.
    pub subjects: Vec<String>,
    /// Questions per subject. The last subject takes any overflow.
    pub per_subject: usize,
    /// How many of each subject's questions are multiple choice. The rest
    /// are numerical.
    pub mcq_per_subject: usize,
}

impl Default for DistributionPlan {
    fn default() -> Self {
        Self {
            subjects: vec![
                "Physics".to_string(),
                "Chemistry".to_string(),
                "Mathematics".to_string(),
            ],
            per_subject: 25,
            mcq_per_subject: 20,
        }
    }
}

impl DistributionPlan {
    fn check(&self) -> BankResult<()> {
        if self.subjects.is_empty() {
            return Err(BankError::InvalidPlan("no subjects given".to_string()));
        }
        if self.per_subject == 0 {
            return Err(BankError::InvalidPlan(
                "per_subject must be at least 1".to_string(),
            ));
        }
        if self.mcq_per_subject > self.per_subject {
            return Err(BankError::InvalidPlan(format!(
                "mcq_per_subject ({}) exceeds per_subject ({})",
                self.mcq_per_subject, self.per_subject
            )));
        }
        Ok(())
    }
}

/// Extra fields of one subject and its sections, held while [`distribute`]
/// rebuilds the bank.
struct SubjectExtras {
    name: String,
    extra: Map<String, Value>,
    sections: Vec<(QuestionType, Map<String, Value>)>,
}

impl SubjectExtras {
    fn has_fields(&self) -> bool {
        !self.extra.is_empty() || !self.sections.is_empty()
    }
}

/// Regroup every question into subjects and sections by position.
///
/// Questions are taken in document order and bucketed `per_subject` at a
/// time; the final subject absorbs whatever is left. Within a subject the
/// first `mcq_per_subject` questions form the MCQ section and have their
/// type forced to MCQ, the rest form the Numerical section. Extra fields of
/// a subject, and of each of its sections, move to the rebuilt subject of
/// the same name; extras of subjects missing from the plan are dropped with
/// a warning.
pub fn distribute(exam: &mut Exam, plan: &DistributionPlan) -> BankResult<()> {
    plan.check()?;

    let old_subjects = std::mem::take(&mut exam.subjects);
    let mut questions: Vec<Question> = Vec::new();
    let mut extras = Vec::new();
    for subject in old_subjects {
        let mut section_extras: Vec<(QuestionType, Map<String, Value>)> = Vec::new();
        for section in subject.sections {
            questions.extend(section.questions);
            if section.extra.is_empty() {
                continue;
            }
            match section_extras.iter_mut().find(|(kind, _)| *kind == section.kind) {
                Some((_, extra)) => {
                    for (key, value) in section.extra {
                        extra.entry(key).or_insert(value);
                    }
                }
                None => section_extras.push((section.kind, section.extra)),
            }
        }
        extras.push(SubjectExtras {
            name: subject.name,
            extra: subject.extra,
            sections: section_extras,
        });
    }
    let total = questions.len();

    let last = plan.subjects.len() - 1;
    let mut remaining = questions.into_iter();
    for (i, name) in plan.subjects.iter().enumerate() {
        let bucket: Vec<Question> = if i == last {
            remaining.by_ref().collect()
        } else {
            remaining.by_ref().take(plan.per_subject).collect()
        };
        if i == last && bucket.len() > plan.per_subject {
            warn!(
                subject = %name,
                count = bucket.len(),
                per_subject = plan.per_subject,
                "last subject absorbs overflow"
            );
        }

        let mut subject = Subject::new(name.clone());
        let kept = extras
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
            .map(|pos| extras.swap_remove(pos));

        let mcq_count = bucket.len().min(plan.mcq_per_subject);
        let mut bucket = bucket.into_iter();
        let mcq = subject.section_mut(QuestionType::Mcq);
        for mut q in bucket.by_ref().take(mcq_count) {
            q.kind = QuestionType::Mcq;
            mcq.questions.push(q);
        }
        let numerical = subject.section_mut(QuestionType::Numerical);
        for mut q in bucket {
            q.kind = QuestionType::Numerical;
            numerical.questions.push(q);
        }

        if let Some(kept) = kept {
            subject.extra = kept.extra;
            for (kind, extra) in kept.sections {
                subject.section_mut(kind).extra = extra;
            }
        }

        debug!(
            subject = %subject.name,
            mcq = subject.sections[0].questions.len(),
            numerical = subject.sections[1].questions.len(),
            "filled subject"
        );
        exam.subjects.push(subject);
    }

    for lost in extras.iter().filter(|e| e.has_fields()) {
        warn!(
            subject = %lost.name,
            "subject is not in the plan, its extra fields are dropped"
        );
    }

    info!(questions = total, subjects = plan.subjects.len(), "distributed questions");
    Ok(())
}

/// Outcome of [`append`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendReport {
    /// Ids of the appended questions, in order.
    pub ids: Vec<QuestionId>,
    /// Drafts whose id was missing or already taken and got a fresh one.
    pub reassigned: usize,
}

/// Append draft questions to one section of one subject, creating either
/// when absent.
///
/// A draft keeps its id when it is set and not used anywhere in the bank;
/// otherwise it gets the next id from `ids`. The section's type is applied
/// to every draft.
pub fn append(
    exam: &mut Exam,
    subject: &str,
    section: QuestionType,
    drafts: Vec<Question>,
    ids: &mut IdAllocator,
) -> AppendReport {
    let mut taken: HashSet<QuestionId> = exam.questions().map(|q| q.id).collect();
    for id in &taken {
        ids.reserve(*id);
    }

    let mut report = AppendReport::default();
    let target = exam.subject_mut(subject).section_mut(section);
    for mut draft in drafts {
        if !draft.id.is_assigned() || taken.contains(&draft.id) {
            let fresh = ids.next_id();
            if draft.id.is_assigned() {
                warn!(old = %draft.id, new = %fresh, "id already in use, reassigned");
            }
            draft.id = fresh;
            report.reassigned += 1;
        }
        ids.reserve(draft.id);
        taken.insert(draft.id);
        draft.kind = section;
        report.ids.push(draft.id);
        target.questions.push(draft);
    }

    info!(
        subject,
        section = %section,
        added = report.ids.len(),
        "appended questions"
    );
    report
}

/// An image to attach to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAssignment {
    pub id: QuestionId,
    /// Only look in this subject. Older banks reuse ids across subjects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<QuestionType>,
    pub image: ImageRef,
}

/// Outcome of [`attach_images`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachReport {
    pub attached: usize,
    /// Assignments that matched no question.
    pub unmatched: Vec<QuestionId>,
}

/// Set the `image` of each question named in `assignments`.
///
/// When an unscoped id matches more than one question only the first, in
/// document order, is changed.
pub fn attach_images(exam: &mut Exam, assignments: &[ImageAssignment]) -> AttachReport {
    let mut report = AttachReport::default();

    for assignment in assignments {
        let mut matches = exam
            .subjects
            .iter_mut()
            .filter(|s| {
                assignment
                    .subject
                    .as_deref()
                    .is_none_or(|name| s.name.eq_ignore_ascii_case(name))
            })
            .flat_map(|s| s.sections.iter_mut())
            .filter(|s| assignment.section.is_none_or(|kind| s.kind == kind))
            .flat_map(|s| s.questions.iter_mut())
            .filter(|q| q.id == assignment.id);

        match matches.next() {
            Some(question) => {
                question.image = assignment.image.clone();
                report.attached += 1;
                debug!(id = %assignment.id, "attached image");
                if matches.next().is_some() {
                    warn!(
                        id = %assignment.id,
                        "id matches several questions; scope it with a subject"
                    );
                }
            }
            None => {
                warn!(id = %assignment.id, subject = ?assignment.subject, "no question for image");
                report.unmatched.push(assignment.id);
            }
        }
    }
    report
}

/// Set answers by id. Returns the ids that matched no question.
pub fn set_answers(exam: &mut Exam, answers: &[(QuestionId, Answer)]) -> Vec<QuestionId> {
    let mut unmatched = Vec::new();
    for (id, answer) in answers {
        match exam.questions_mut().find(|q| q.id == *id) {
            Some(question) => question.answer = Some(answer.clone()),
            None => {
                warn!(%id, "no question for answer");
                unmatched.push(*id);
            }
        }
    }
    unmatched
}

/// Overwrite every answer with `value` (`None` clears them). Returns the
/// number of questions touched.
pub fn reset_answers(exam: &mut Exam, value: Option<Answer>) -> usize {
    let mut count = 0;
    for question in exam.questions_mut() {
        question.answer = value.clone();
        count += 1;
    }
    info!(count, "reset answers");
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CropRect;

    fn flat_exam(n: u32) -> Exam {
        let mut exam = Exam::new("QFT 4");
        let section = exam.subject_mut("Physics").section_mut(QuestionType::Mcq);
        for i in 1..=n {
            section.questions.push(Question::new(
                QuestionId(i),
                QuestionType::Mcq,
                format!("question {i}"),
            ));
        }
        exam
    }

    fn ids(section: &crate::bank::Section) -> Vec<u32> {
        section.questions.iter().map(|q| q.id.0).collect()
    }

    #[test]
    fn distribute_buckets_by_position() {
        let mut exam = flat_exam(71);
        distribute(&mut exam, &DistributionPlan::default()).unwrap();

        assert_eq!(exam.subjects.len(), 3);
        assert_eq!(exam.subjects[0].question_count(), 25);
        assert_eq!(exam.subjects[1].question_count(), 25);
        assert_eq!(exam.subjects[2].question_count(), 21);

        let physics = &exam.subjects[0];
        assert_eq!(physics.sections[0].kind, QuestionType::Mcq);
        assert_eq!(physics.sections[0].questions.len(), 20);
        assert_eq!(physics.sections[1].kind, QuestionType::Numerical);
        assert!(physics.sections[1]
            .questions
            .iter()
            .all(|q| q.kind == QuestionType::Numerical));
    }

    #[test]
    fn distribute_keeps_ids() {
        let mut exam = flat_exam(30);
        distribute(&mut exam, &DistributionPlan::default()).unwrap();
        assert_eq!(ids(&exam.subjects[1].sections[0]), (26..=30).collect::<Vec<_>>());
        assert!(exam.subjects[2].sections.iter().all(|s| s.questions.is_empty()));
    }

    #[test]
    fn distribute_last_subject_absorbs_overflow() {
        let mut exam = flat_exam(80);
        distribute(&mut exam, &DistributionPlan::default()).unwrap();
        let maths = &exam.subjects[2];
        assert_eq!(maths.name, "Mathematics");
        assert_eq!(maths.sections[0].questions.len(), 20);
        assert_eq!(maths.sections[1].questions.len(), 10);
    }

    #[test]
    fn distribute_keeps_subject_extras() {
        let mut exam = flat_exam(3);
        exam.subjects[0]
            .extra
            .insert("color".to_string(), serde_json::json!("blue"));
        distribute(&mut exam, &DistributionPlan::default()).unwrap();
        assert_eq!(exam.subjects[0].extra["color"], "blue");
    }

    #[test]
    fn distribute_keeps_section_extras() {
        let mut exam: Exam = serde_json::from_value(serde_json::json!({
            "examTitle": "QFT 4",
            "subjects": [
                {"name": "Physics", "sections": [
                    {"name": "MCQ", "instructions": "Single correct", "questions": [
                        {"id": 1, "type": "MCQ", "text": "a"},
                        {"id": 2, "type": "MCQ", "text": "b"}
                    ]},
                    {"name": "Numerical", "marks": 4, "questions": [
                        {"id": 3, "type": "Numerical", "text": "c"}
                    ]}
                ]},
                {"name": "Biology", "color": "green", "sections": [
                    {"name": "MCQ", "questions": [{"id": 4, "type": "MCQ", "text": "d"}]}
                ]}
            ]
        }))
        .unwrap();
        let plan = DistributionPlan {
            subjects: vec!["Physics".to_string(), "Chemistry".to_string()],
            per_subject: 2,
            mcq_per_subject: 1,
        };
        distribute(&mut exam, &plan).unwrap();

        let physics = &exam.subjects[0];
        assert_eq!(physics.sections[0].kind, QuestionType::Mcq);
        assert_eq!(physics.sections[0].extra["instructions"], "Single correct");
        assert_eq!(physics.sections[1].extra["marks"], 4);

        // Biology is not in the plan: its questions move, its extras do not
        let chemistry = &exam.subjects[1];
        assert_eq!(chemistry.question_count(), 2);
        assert!(chemistry.extra.is_empty());
        assert!(chemistry.sections.iter().all(|s| s.extra.is_empty()));
        assert_eq!(exam.question_count(), 4);
    }

    #[test]
    fn distribute_rejects_bad_plan() {
        let mut exam = flat_exam(3);
        let plan = DistributionPlan {
            mcq_per_subject: 30,
            ..DistributionPlan::default()
        };
        let err = distribute(&mut exam, &plan).unwrap_err();
        assert!(matches!(err, BankError::InvalidPlan(_)));
        // the bank is untouched when the plan is rejected
        assert_eq!(exam.question_count(), 3);

        let plan = DistributionPlan {
            subjects: vec![],
            ..DistributionPlan::default()
        };
        assert!(distribute(&mut exam, &plan).is_err());
    }

    #[test]
    fn append_creates_subject_and_assigns_ids() {
        let mut exam = flat_exam(25);
        let mut ids = IdAllocator::for_exam(&exam);
        let drafts = vec![
            Question::new(QuestionId(0), QuestionType::Mcq, "new one"),
            Question::new(QuestionId(3), QuestionType::Mcq, "clashes"),
            Question::new(QuestionId(40), QuestionType::Mcq, "explicit"),
        ];
        let report = append(&mut exam, "Mathematics", QuestionType::Numerical, drafts, &mut ids);

        assert_eq!(report.ids, vec![QuestionId(26), QuestionId(27), QuestionId(40)]);
        assert_eq!(report.reassigned, 2);
        let maths = exam.subject("mathematics").unwrap();
        assert_eq!(maths.sections[0].kind, QuestionType::Numerical);
        assert!(maths.sections[0]
            .questions
            .iter()
            .all(|q| q.kind == QuestionType::Numerical));
        assert_eq!(ids.next_id(), QuestionId(41));
    }

    #[test]
    fn attach_images_by_id_and_scope() {
        let mut exam = flat_exam(2);
        exam.subject_mut("Chemistry")
            .section_mut(QuestionType::Mcq)
            .questions
            .push(Question::new(QuestionId(1), QuestionType::Mcq, "chem 1"));

        let crop = CropRect {
            x: 0,
            y: 430,
            width: 612,
            height: 250,
        };
        let assignments = vec![
            ImageAssignment {
                id: QuestionId(1),
                subject: Some("chemistry".to_string()),
                section: None,
                image: ImageRef::cropped("qft4_images/page_21.png", crop),
            },
            ImageAssignment {
                id: QuestionId(2),
                subject: None,
                section: Some(QuestionType::Mcq),
                image: ImageRef::diagram("qft4_images/diagrams/physics_mcq_q2.png"),
            },
            ImageAssignment {
                id: QuestionId(99),
                subject: None,
                section: None,
                image: ImageRef::diagram("nowhere.png"),
            },
        ];
        let report = attach_images(&mut exam, &assignments);

        assert_eq!(report.attached, 2);
        assert_eq!(report.unmatched, vec![QuestionId(99)]);
        let physics_q1 = &exam.subjects[0].sections[0].questions[0];
        assert!(physics_q1.image.is_none());
        let chem_q1 = &exam.subjects[1].sections[0].questions[0];
        assert_eq!(chem_q1.image.crop(), Some(crop));
    }

    #[test]
    fn answers_set_and_reset() {
        let mut exam = flat_exam(3);
        let unmatched = set_answers(
            &mut exam,
            &[(QuestionId(2), Answer::Index(1)), (QuestionId(7), Answer::Index(0))],
        );
        assert_eq!(unmatched, vec![QuestionId(7)]);
        assert_eq!(exam.questions().nth(1).unwrap().answer, Some(Answer::Index(1)));

        assert_eq!(reset_answers(&mut exam, Some(Answer::Index(0))), 3);
        assert!(exam.questions().all(|q| q.answer == Some(Answer::Index(0))));
        reset_answers(&mut exam, None);
        assert!(exam.questions().all(|q| q.answer.is_none()));
    }
}
