//! qbank-core: question-bank data model and transformations.
//!
//! This crate owns the `Exam -> Subject -> Section -> Question` document
//! model, the tagged [`ImageRef`] schema (with migration from older shapes),
//! and the edits the question-bank pipeline applies to a bank: appending
//! records, attaching images, regrouping, LaTeX conversion, validation and
//! the flat simulator export. It does no image or PDF work; see
//! `qbank-raster` for that.

pub mod assets;
pub mod bank;
pub mod error;
pub mod export;
pub mod geometry;
pub mod image_ref;
pub mod io;
pub mod latex;
pub mod paths;
pub mod reshape;
pub mod validate;

pub use assets::{EmbedReport, ImageIssue, ImageProblem, check_images, embed_images, prune_missing};
pub use bank::{Answer, Exam, IdAllocator, Question, QuestionId, QuestionType, Section, Subject};
pub use error::{BankError, BankResult};
pub use export::{DiagramRef, SimQuestion, SimulatorExport, to_simulator};
pub use geometry::{CropRect, PixelRect, PointRect};
pub use image_ref::ImageRef;
pub use io::{JsonStyle, load_exam, load_json, save_exam, save_json};
pub use latex::{LatexPass, LatexRepair, LatexReport, apply_to_exam, unicode_to_latex};
pub use paths::PathConfig;
pub use reshape::{
    AppendReport, AttachReport, DistributionPlan, ImageAssignment, append, attach_images,
    distribute, reset_answers, set_answers,
};
pub use validate::{BankSummary, Severity, ValidationIssue, summarize, validate_exam};
