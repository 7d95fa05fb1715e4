//! Question image metadata.
//!
//! Older question banks store the `image` field in several shapes: a flat
//! path string, `{sourcePage, crop: null}`, `{sourcePage, crop: {x, y,
//! width, height}}`, or `{sourcePage, crop: "path"}`. [`ImageRef`] reads all
//! of them and always writes a single tagged form:
//!
//! ```json
//! {"kind": "cropped", "sourcePage": "qft4_images/page_21.png",
//!  "crop": {"x": 0, "y": 430, "width": 612, "height": 250}}
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geometry::CropRect;

/// Image attached to a question.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageRef {
    /// No image.
    #[default]
    None,
    /// Only the full rendered page, shown as context.
    SourcePage(String),
    /// A pre-cropped diagram file, optionally with the page it came from.
    Diagram {
        path: String,
        source_page: Option<String>,
    },
    /// A region of a source page, optionally with its cropped file.
    Cropped {
        source_page: String,
        crop: CropRect,
        diagram: Option<String>,
    },
}

impl ImageRef {
    pub fn is_none(&self) -> bool {
        matches!(self, ImageRef::None)
    }

    pub fn diagram(path: impl Into<String>) -> Self {
        ImageRef::Diagram {
            path: path.into(),
            source_page: None,
        }
    }

    pub fn cropped(source_page: impl Into<String>, crop: CropRect) -> Self {
        ImageRef::Cropped {
            source_page: source_page.into(),
            crop,
            diagram: None,
        }
    }

    /// The full page image, if any.
    pub fn source_page(&self) -> Option<&str> {
        match self {
            ImageRef::None => None,
            ImageRef::SourcePage(page) => Some(page),
            ImageRef::Diagram { source_page, .. } => source_page.as_deref(),
            ImageRef::Cropped { source_page, .. } => Some(source_page),
        }
    }

    /// The cropped diagram file, if any.
    pub fn diagram_path(&self) -> Option<&str> {
        match self {
            ImageRef::Diagram { path, .. } => Some(path),
            ImageRef::Cropped { diagram, .. } => diagram.as_deref(),
            _ => None,
        }
    }

    /// The crop region, if any.
    pub fn crop(&self) -> Option<CropRect> {
        match self {
            ImageRef::Cropped { crop, .. } => Some(*crop),
            _ => None,
        }
    }

    /// Every file path this reference points at.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = Vec::with_capacity(2);
        if let Some(diagram) = self.diagram_path() {
            paths.push(diagram);
        }
        if let Some(page) = self.source_page() {
            paths.push(page);
        }
        paths
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum Canonical {
    SourcePage {
        #[serde(rename = "sourcePage")]
        source_page: String,
    },
    Diagram {
        path: String,
        #[serde(
            rename = "sourcePage",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        source_page: Option<String>,
    },
    Cropped {
        #[serde(rename = "sourcePage")]
        source_page: String,
        crop: CropRect,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagram: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LegacyObject {
    #[serde(rename = "sourcePage", default)]
    source_page: Option<String>,
    #[serde(default)]
    crop: Option<LegacyCrop>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyCrop {
    Rect(CropRect),
    Path(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Canonical(Canonical),
    Path(String),
    Legacy(LegacyObject),
    Null,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

impl TryFrom<Repr> for ImageRef {
    type Error = String;

    fn try_from(repr: Repr) -> Result<Self, Self::Error> {
        Ok(match repr {
            Repr::Null => ImageRef::None,
            Repr::Path(path) => match non_empty(Some(path)) {
                Some(path) => ImageRef::diagram(path),
                None => ImageRef::None,
            },
            Repr::Canonical(Canonical::SourcePage { source_page }) => {
                ImageRef::SourcePage(source_page)
            }
            Repr::Canonical(Canonical::Diagram { path, source_page }) => ImageRef::Diagram {
                path,
                source_page: non_empty(source_page),
            },
            Repr::Canonical(Canonical::Cropped {
                source_page,
                crop,
                diagram,
            }) => ImageRef::Cropped {
                source_page,
                crop,
                diagram: non_empty(diagram),
            },
            Repr::Legacy(LegacyObject { source_page, crop }) => {
                let source_page = non_empty(source_page);
                match (source_page, crop) {
                    (None, None) => ImageRef::None,
                    (Some(page), None) => ImageRef::SourcePage(page),
                    (Some(page), Some(LegacyCrop::Rect(crop))) => ImageRef::Cropped {
                        source_page: page,
                        crop,
                        diagram: None,
                    },
                    (None, Some(LegacyCrop::Rect(_))) => {
                        return Err("image crop rect has no sourcePage".to_string());
                    }
                    (page, Some(LegacyCrop::Path(path))) => match non_empty(Some(path)) {
                        Some(path) => ImageRef::Diagram {
                            path,
                            source_page: page,
                        },
                        None => match page {
                            Some(page) => ImageRef::SourcePage(page),
                            None => ImageRef::None,
                        },
                    },
                }
            }
        })
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = Repr::deserialize(deserializer)?;
        ImageRef::try_from(repr).map_err(D::Error::custom)
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let canonical = match self {
            ImageRef::None => return serializer.serialize_none(),
            ImageRef::SourcePage(page) => Canonical::SourcePage {
                source_page: page.clone(),
            },
            ImageRef::Diagram { path, source_page } => Canonical::Diagram {
                path: path.clone(),
                source_page: source_page.clone(),
            },
            ImageRef::Cropped {
                source_page,
                crop,
                diagram,
            } => Canonical::Cropped {
                source_page: source_page.clone(),
                crop: *crop,
                diagram: diagram.clone(),
            },
        };
        canonical.serialize(serializer)
    }
}
