use std::path::{Path, PathBuf};

/// Where the dashboard's files live on disk.
///
/// Image paths stored in a bank are relative to the dashboard's `public`
/// directory, sometimes with a leading `/`. Every command that touches image
/// files resolves them through this struct instead of baking in absolute
/// paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    /// Directory that image paths in the bank are relative to.
    pub public_dir: PathBuf,
}

impl PathConfig {
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
        }
    }

    /// Resolve a bank image path (`/qft4_images/page_1.png` or
    /// `qft4_images\page_1.png`) against `public_dir`.
    pub fn resolve_public(&self, relative: &str) -> PathBuf {
        let trimmed = relative.trim().trim_start_matches(['/', '\\']);
        let mut path = self.public_dir.clone();
        for part in trimmed.split(['/', '\\']).filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    /// Inverse of [`resolve_public`](Self::resolve_public): express `path`
    /// relative to `public_dir` with forward slashes, if it lies inside it.
    pub fn to_public(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.public_dir).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::new("public")
    }
}
