//! Image files referenced from a bank.
//!
//! Paths in a bank are relative to the dashboard's public directory and
//! are resolved through [`PathConfig`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use crate::bank::{Exam, QuestionId};
use crate::error::{BankError, BankResult};
use crate::export::{DiagramRef, SimulatorExport};
use crate::image_ref::ImageRef;
use crate::paths::PathConfig;

/// Extra question field describing a diagram in words. Dropped together with
/// the image it describes.
pub const DIAGRAM_DESCRIPTION_KEY: &str = "diagram_desc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProblem {
    Missing,
    Empty,
}

impl fmt::Display for ImageProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageProblem::Missing => f.write_str("missing"),
            ImageProblem::Empty => f.write_str("empty"),
        }
    }
}

/// A referenced image that cannot be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageIssue {
    pub id: QuestionId,
    pub subject: String,
    /// Path as written in the bank.
    pub path: String,
    pub resolved: PathBuf,
    pub problem: ImageProblem,
}

impl fmt::Display for ImageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Q{}: {} ({})",
            self.problem.to_string().to_uppercase(),
            self.subject,
            self.id,
            self.path,
            self.resolved.display()
        )
    }
}

fn problem_with(path: &Path) -> Option<ImageProblem> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Some(ImageProblem::Empty),
        Ok(_) => None,
        Err(_) => Some(ImageProblem::Missing),
    }
}

/// Every referenced image that is missing or zero bytes.
pub fn check_images(exam: &Exam, paths: &PathConfig) -> Vec<ImageIssue> {
    let mut issues = Vec::new();
    let mut checked = 0usize;
    for (subject, question) in exam.questions_with_subject() {
        for rel in question.image.paths() {
            checked += 1;
            let resolved = paths.resolve_public(rel);
            if let Some(problem) = problem_with(&resolved) {
                debug!(id = %question.id, path = rel, %problem, "unusable image");
                issues.push(ImageIssue {
                    id: question.id,
                    subject: subject.to_string(),
                    path: rel.to_string(),
                    resolved,
                    problem,
                });
            }
        }
    }
    info!(checked, problems = issues.len(), "checked image references");
    issues
}

/// Drop the parts of `image` whose files are unusable, keeping whatever
/// still shows something.
fn prune_ref(image: &ImageRef, usable: impl Fn(&str) -> bool) -> ImageRef {
    match image {
        ImageRef::None => ImageRef::None,
        ImageRef::SourcePage(page) => {
            if usable(page.as_str()) {
                image.clone()
            } else {
                ImageRef::None
            }
        }
        ImageRef::Diagram { path, source_page } => {
            let page = source_page.clone().filter(|p| usable(p.as_str()));
            if usable(path.as_str()) {
                ImageRef::Diagram {
                    path: path.clone(),
                    source_page: page,
                }
            } else {
                page.map_or(ImageRef::None, ImageRef::SourcePage)
            }
        }
        ImageRef::Cropped {
            source_page,
            crop,
            diagram,
        } => {
            let diagram = diagram.clone().filter(|d| usable(d.as_str()));
            if usable(source_page.as_str()) {
                ImageRef::Cropped {
                    source_page: source_page.clone(),
                    crop: *crop,
                    diagram,
                }
            } else {
                diagram.map_or(ImageRef::None, ImageRef::diagram)
            }
        }
    }
}

/// Remove references to missing or empty files. A question left with no
/// image also loses its diagram description. Returns the number of
/// questions changed.
pub fn prune_missing(exam: &mut Exam, paths: &PathConfig) -> usize {
    let usable = |rel: &str| problem_with(&paths.resolve_public(rel)).is_none();
    let mut changed = 0;
    for question in exam.questions_mut() {
        let pruned = prune_ref(&question.image, usable);
        if pruned == question.image {
            continue;
        }
        info!(id = %question.id, before = ?question.image.paths(), after = ?pruned.paths(), "pruned image");
        if pruned.is_none() {
            question.extra.remove(DIAGRAM_DESCRIPTION_KEY);
        }
        question.image = pruned;
        changed += 1;
    }
    changed
}

/// MIME type for an image file name, defaulting to PNG.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "image/png",
    }
}

/// Read a file into a `data:` URL.
pub fn data_url(path: &Path) -> BankResult<String> {
    let bytes = fs::read(path).map_err(|e| BankError::io(path, e))?;
    Ok(format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes)))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedReport {
    pub embedded: usize,
    pub missing: usize,
}

/// Replace diagram paths in an export with inline `data:` URLs so the file
/// can be opened without the public directory. Missing files are logged and
/// their paths left in place.
pub fn embed_images(export: &mut SimulatorExport, paths: &PathConfig) -> BankResult<EmbedReport> {
    let mut report = EmbedReport::default();
    for question in &mut export.questions {
        let Some(DiagramRef::Path(path)) = &mut question.diagram else {
            continue;
        };
        if path.starts_with("data:") {
            continue;
        }
        let resolved = paths.resolve_public(path);
        if !resolved.is_file() {
            warn!(id = %question.id, path = %resolved.display(), "image not found, leaving path");
            report.missing += 1;
            continue;
        }
        *path = data_url(&resolved)?;
        report.embedded += 1;
    }
    info!(embedded = report.embedded, missing = report.missing, "embedded images");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::{Question, QuestionType};
    use crate::export::to_simulator;
    use crate::geometry::CropRect;

    struct Fixture {
        _dir: tempfile::TempDir,
        paths: PathConfig,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(public.join("qft4_images/diagrams")).unwrap();
        fs::write(public.join("qft4_images/page_1.png"), b"\x89PNG page").unwrap();
        fs::write(public.join("qft4_images/diagrams/q1.png"), b"\x89PNG diagram").unwrap();
        fs::write(public.join("qft4_images/diagrams/empty.png"), b"").unwrap();
        Fixture {
            _dir: dir,
            paths: PathConfig::new(public),
        }
    }

    fn exam_with(images: Vec<ImageRef>) -> Exam {
        let mut exam = Exam::new("QFT 4");
        let section = exam.subject_mut("Physics").section_mut(QuestionType::Mcq);
        for (i, image) in images.into_iter().enumerate() {
            let mut q = Question::new(QuestionId(i as u32 + 1), QuestionType::Mcq, "q");
            q.image = image;
            q.extra
                .insert(DIAGRAM_DESCRIPTION_KEY.to_string(), "figure".into());
            section.questions.push(q);
        }
        exam
    }

    #[test]
    fn check_reports_missing_and_empty() {
        let fx = fixture();
        let exam = exam_with(vec![
            ImageRef::diagram("/qft4_images/diagrams/q1.png"),
            ImageRef::diagram("qft4_images/diagrams/gone.png"),
            ImageRef::diagram("qft4_images/diagrams/empty.png"),
            ImageRef::None,
        ]);
        let issues = check_images(&exam, &fx.paths);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].id, QuestionId(2));
        assert_eq!(issues[0].problem, ImageProblem::Missing);
        assert_eq!(issues[1].problem, ImageProblem::Empty);
        assert!(issues[0].to_string().starts_with("MISSING Physics Q2"));
    }

    #[test]
    fn prune_clears_dangling_refs_and_descriptions() {
        let fx = fixture();
        let mut exam = exam_with(vec![
            ImageRef::diagram("qft4_images/diagrams/q1.png"),
            ImageRef::diagram("qft4_images/diagrams/gone.png"),
        ]);
        assert_eq!(prune_missing(&mut exam, &fx.paths), 1);

        let questions: Vec<&Question> = exam.questions().collect();
        assert!(!questions[0].image.is_none());
        assert!(questions[0].extra.contains_key(DIAGRAM_DESCRIPTION_KEY));
        assert!(questions[1].image.is_none());
        assert!(!questions[1].extra.contains_key(DIAGRAM_DESCRIPTION_KEY));
    }

    #[test]
    fn prune_keeps_usable_parts() {
        let fx = fixture();
        let crop = CropRect {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };
        let mut exam = exam_with(vec![
            ImageRef::Cropped {
                source_page: "qft4_images/page_1.png".to_string(),
                crop,
                diagram: Some("qft4_images/diagrams/gone.png".to_string()),
            },
            ImageRef::Diagram {
                path: "qft4_images/diagrams/gone.png".to_string(),
                source_page: Some("qft4_images/page_1.png".to_string()),
            },
        ]);
        assert_eq!(prune_missing(&mut exam, &fx.paths), 2);

        let questions: Vec<&Question> = exam.questions().collect();
        assert_eq!(
            questions[0].image,
            ImageRef::cropped("qft4_images/page_1.png", crop)
        );
        assert_eq!(
            questions[1].image,
            ImageRef::SourcePage("qft4_images/page_1.png".to_string())
        );
        // still has an image, so the description stays
        assert!(questions[1].extra.contains_key(DIAGRAM_DESCRIPTION_KEY));
    }

    #[test]
    fn embed_inlines_existing_files() {
        let fx = fixture();
        let exam = exam_with(vec![
            ImageRef::diagram("/qft4_images/diagrams/q1.png"),
            ImageRef::diagram("qft4_images/diagrams/gone.png"),
            ImageRef::SourcePage("qft4_images/page_1.png".to_string()),
        ]);
        let mut export = to_simulator(&exam);
        let report = embed_images(&mut export, &fx.paths).unwrap();

        assert_eq!(report, EmbedReport { embedded: 1, missing: 1 });
        let Some(DiagramRef::Path(first)) = &export.questions[0].diagram else {
            panic!("expected a path diagram");
        };
        assert_eq!(
            first,
            &format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG diagram"))
        );
        assert_eq!(
            export.questions[1].diagram,
            Some(DiagramRef::Path("qft4_images/diagrams/gone.png".to_string()))
        );
    }

    #[test]
    fn mime_by_extension() {
        assert_eq!(mime_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_for(Path::new("noext")), "image/png");
    }
}
