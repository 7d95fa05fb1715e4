//! Crop manifests: the crop jobs for one paper, in TOML.
//!
//! ```toml
//! pages_dir = "public/qft4_images"
//! out_dir = "public/qft4_images/diagrams"
//! bank = "src/data/qft4.json"
//!
//! # bounding box inside a search zone
//! [[zone]]
//! page = "page_21.png"
//! y = [550, 720]
//! x = [50, 560]
//! out = "q3.png"
//! question = 3
//! subject = "Physics"
//!
//! # full-width rows, trimmed to their content
//! [[strip]]
//! page = "page_5.png"
//! y = [400, 700]
//! out = "q7.png"
//!
//! # region of a PDF page in points, rendered at `dpi`
//! [[clip]]
//! pdf = "qft6.pdf"
//! page = 3
//! rect = [36.0, 72.0, 576.0, 300.0]
//! out = "q9.png"
//!
//! # a figure split across two pages
//! [[stitch]]
//! out = "q12.png"
//! [[stitch.part]]
//! page = "page_11.png"
//! y = [600, 792]
//! [[stitch.part]]
//! page = "page_12.png"
//! y = [0, 200]
//! ```
//!
//! Relative paths resolve against the manifest's directory, then against
//! `pages_dir`/`out_dir` when those are set.

use std::ops::Range;
use std::path::{Path, PathBuf};

use qbank_core::{ImageAssignment, ImageRef, PointRect, QuestionId};
use qbank_raster::SearchWindow;
use serde::Deserialize;

/// Padding around strips. Strips hold whole questions, so a little more air
/// than diagram zones.
pub const STRIP_PADDING: u32 = 25;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropManifest {
    pub pages_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    /// Bank the crops are attached to.
    pub bank: Option<PathBuf>,
    #[serde(rename = "zone")]
    pub zones: Vec<ZoneJob>,
    #[serde(rename = "strip")]
    pub strips: Vec<StripJob>,
    #[serde(rename = "clip")]
    pub clips: Vec<ClipJob>,
    #[serde(rename = "stitch")]
    pub stitches: Vec<StitchJob>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneJob {
    pub page: PathBuf,
    pub y: [u32; 2],
    /// Columns to search; the full width when absent.
    #[serde(default)]
    pub x: Option<[u32; 2]>,
    pub out: PathBuf,
    /// Defaults to `[detect] padding`.
    #[serde(default)]
    pub padding: Option<u32>,
    /// Crop the zone itself when it holds no ink.
    #[serde(default = "default_true")]
    pub fallback: bool,
    #[serde(default)]
    pub question: Option<QuestionId>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StripJob {
    pub page: PathBuf,
    pub y: [u32; 2],
    pub out: PathBuf,
    #[serde(default)]
    pub padding: Option<u32>,
    #[serde(default)]
    pub question: Option<QuestionId>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipJob {
    pub pdf: PathBuf,
    /// 1-indexed page number.
    pub page: usize,
    /// `[x0, top, x1, bottom]` in PDF points from the top-left corner.
    pub rect: [f32; 4],
    /// Defaults to `[render] clip_dpi`.
    #[serde(default)]
    pub dpi: Option<f32>,
    pub out: PathBuf,
    #[serde(default)]
    pub question: Option<QuestionId>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StitchJob {
    pub out: PathBuf,
    #[serde(rename = "part")]
    pub parts: Vec<StitchPart>,
    #[serde(default)]
    pub padding: Option<u32>,
    #[serde(default)]
    pub question: Option<QuestionId>,
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StitchPart {
    pub page: PathBuf,
    pub y: [u32; 2],
    #[serde(default)]
    pub x: Option<[u32; 2]>,
}

fn default_true() -> bool {
    true
}

fn span(pair: [u32; 2], what: &str) -> Result<Range<u32>, String> {
    let [start, end] = pair;
    if start >= end {
        return Err(format!("{what} range [{start}, {end}] is empty"));
    }
    Ok(start..end)
}

/// Search window for a `y` span and optional `x` span.
pub fn window(y: [u32; 2], x: Option<[u32; 2]>) -> Result<SearchWindow, String> {
    let mut window = SearchWindow::rows(span(y, "y")?);
    if let Some(x) = x {
        window = window.with_columns(span(x, "x")?);
    }
    Ok(window)
}

pub fn point_rect(rect: [f32; 4]) -> Result<PointRect, String> {
    let [x0, top, x1, bottom] = rect;
    if !(x0 < x1 && top < bottom) {
        return Err(format!("clip rect {rect:?} is empty"));
    }
    Ok(PointRect::new(x0, top, x1, bottom))
}

/// An image assignment for a job that names its question.
pub fn assignment(
    question: Option<QuestionId>,
    subject: Option<&str>,
    image: ImageRef,
) -> Option<ImageAssignment> {
    Some(ImageAssignment {
        id: question?,
        subject: subject.map(str::to_string),
        section: None,
        image,
    })
}

impl CropManifest {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let manifest: CropManifest = toml::from_str(&text)
            .map_err(|e| format!("invalid manifest {}: {e}", path.display()))?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Reject geometry that can never produce a crop before any work is done.
    pub fn check(&self) -> Result<(), String> {
        for job in &self.zones {
            window(job.y, job.x).map_err(|e| format!("zone {}: {e}", job.out.display()))?;
        }
        for job in &self.strips {
            window(job.y, None).map_err(|e| format!("strip {}: {e}", job.out.display()))?;
        }
        for job in &self.clips {
            point_rect(job.rect).map_err(|e| format!("clip {}: {e}", job.out.display()))?;
            if job.page == 0 {
                return Err(format!("clip {}: pages start at 1", job.out.display()));
            }
        }
        for job in &self.stitches {
            if job.parts.is_empty() {
                return Err(format!("stitch {}: no parts", job.out.display()));
            }
            for part in &job.parts {
                window(part.y, part.x)
                    .map_err(|e| format!("stitch {}: {e}", job.out.display()))?;
            }
        }
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.zones.len() + self.strips.len() + self.clips.len() + self.stitches.len()
    }
}

/// Resolves the relative paths of a manifest.
#[derive(Debug, Clone)]
pub struct ManifestPaths {
    base: PathBuf,
    pages: PathBuf,
    out: PathBuf,
}

fn join(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl ManifestPaths {
    pub fn new(manifest_path: &Path, manifest: &CropManifest) -> Self {
        let base = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let pages = manifest
            .pages_dir
            .as_deref()
            .map_or_else(|| base.clone(), |dir| join(&base, dir));
        let out = manifest
            .out_dir
            .as_deref()
            .map_or_else(|| base.clone(), |dir| join(&base, dir));
        Self { base, pages, out }
    }

    pub fn page(&self, page: &Path) -> PathBuf {
        join(&self.pages, page)
    }

    pub fn out(&self, out: &Path) -> PathBuf {
        join(&self.out, out)
    }

    pub fn file(&self, path: &Path) -> PathBuf {
        join(&self.base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        pages_dir = "pages"
        out_dir = "diagrams"

        [[zone]]
        page = "page_21.png"
        y = [550, 720]
        x = [50, 560]
        out = "q3.png"
        question = 3
        subject = "Physics"

        [[strip]]
        page = "page_5.png"
        y = [400, 700]
        out = "q7.png"

        [[clip]]
        pdf = "qft6.pdf"
        page = 3
        rect = [36.0, 72.0, 576.0, 300.0]
        out = "q9.png"

        [[stitch]]
        out = "q12.png"
        [[stitch.part]]
        page = "page_11.png"
        y = [600, 792]
        [[stitch.part]]
        page = "page_12.png"
        y = [0, 200]
    "#;

    #[test]
    fn parses_every_job_kind() {
        let manifest: CropManifest = toml::from_str(SAMPLE).unwrap();
        manifest.check().unwrap();
        assert_eq!(manifest.job_count(), 4);
        let zone = &manifest.zones[0];
        assert_eq!(zone.question, Some(QuestionId(3)));
        assert!(zone.fallback);
        assert_eq!(zone.padding, None);
        assert_eq!(manifest.stitches[0].parts.len(), 2);
        assert_eq!(manifest.clips[0].rect[3], 300.0);
    }

    #[test]
    fn zone_window_has_columns() {
        let manifest: CropManifest = toml::from_str(SAMPLE).unwrap();
        let zone = &manifest.zones[0];
        let window = window(zone.y, zone.x).unwrap();
        assert_eq!(window, SearchWindow::rows(550..720).with_columns(50..560));
    }

    #[test]
    fn empty_spans_rejected() {
        let manifest: CropManifest =
            toml::from_str("[[strip]]\npage = \"p.png\"\ny = [300, 300]\nout = \"o.png\"").unwrap();
        assert!(manifest.check().unwrap_err().contains("empty"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = toml::from_str::<CropManifest>(
            "[[zone]]\npage = \"p.png\"\ny = [0, 10]\nout = \"o.png\"\npading = 4",
        );
        assert!(result.is_err());
    }

    #[test]
    fn paths_resolve_against_manifest_dir() {
        let manifest: CropManifest = toml::from_str(SAMPLE).unwrap();
        let paths = ManifestPaths::new(Path::new("papers/qft4/crops.toml"), &manifest);
        assert_eq!(
            paths.page(Path::new("page_21.png")),
            PathBuf::from("papers/qft4/pages/page_21.png")
        );
        assert_eq!(
            paths.out(Path::new("q3.png")),
            PathBuf::from("papers/qft4/diagrams/q3.png")
        );
        assert_eq!(paths.file(Path::new("qft6.pdf")), PathBuf::from("papers/qft4/qft6.pdf"));
    }

    #[test]
    fn assignment_needs_question() {
        assert!(assignment(None, Some("Physics"), ImageRef::diagram("a.png")).is_none());
        let a = assignment(Some(QuestionId(4)), Some("Physics"), ImageRef::diagram("a.png")).unwrap();
        assert_eq!(a.subject.as_deref(), Some("Physics"));
    }
}
