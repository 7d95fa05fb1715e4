//! Deciding whether a pixel is content ("ink") or background.

use image::Rgba;
use serde::{Deserialize, Serialize};

/// Alpha below which a pixel counts as background regardless of colour.
pub const TRANSPARENT_ALPHA: u8 = 50;

/// Which side of the threshold is content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Dark content on a light page (scans, rendered PDFs).
    #[default]
    DarkOnLight,
    /// Light content on a dark page (dark-mode screenshots).
    LightOnDark,
}

/// How a pixel's colour is reduced to one brightness value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Brightness {
    /// Darkest channel. Any tinted pixel is ink, which catches coloured
    /// diagram lines that average out close to white.
    #[default]
    MinChannel,
    /// Mean of R, G and B.
    Mean,
}

impl Brightness {
    fn of(self, px: &Rgba<u8>) -> u8 {
        let [r, g, b, _] = px.0;
        match self {
            Brightness::MinChannel => r.min(g).min(b),
            Brightness::Mean => ((r as u16 + g as u16 + b as u16) / 3) as u8,
        }
    }
}

/// Classifies pixels as ink or background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InkClassifier {
    pub threshold: u8,
    pub polarity: Polarity,
    pub brightness: Brightness,
}

impl Default for InkClassifier {
    fn default() -> Self {
        Self::for_bbox()
    }
}

impl InkClassifier {
    /// Bounding-box detection on rendered pages: any channel below 240.
    pub fn for_bbox() -> Self {
        Self {
            threshold: 240,
            polarity: Polarity::DarkOnLight,
            brightness: Brightness::MinChannel,
        }
    }

    /// Row scanning for question segmentation: mean brightness below 250.
    pub fn for_rows() -> Self {
        Self {
            threshold: 250,
            polarity: Polarity::DarkOnLight,
            brightness: Brightness::Mean,
        }
    }

    /// Dark-mode screenshots: anything brighter than `threshold` is content.
    pub fn dark_mode(threshold: u8) -> Self {
        Self {
            threshold,
            polarity: Polarity::LightOnDark,
            brightness: Brightness::Mean,
        }
    }

    pub fn is_ink(&self, px: &Rgba<u8>) -> bool {
        if px.0[3] < TRANSPARENT_ALPHA {
            return false;
        }
        let value = self.brightness.of(px);
        match self.polarity {
            Polarity::DarkOnLight => value < self.threshold,
            Polarity::LightOnDark => value > self.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn dark_on_light() {
        let ink = InkClassifier::for_bbox();
        assert!(ink.is_ink(&BLACK));
        assert!(!ink.is_ink(&WHITE));
        // light blue line: mean is high but one channel is dark
        assert!(ink.is_ink(&Rgba([120, 250, 250, 255])));
    }

    #[test]
    fn mean_brightness_ignores_single_tinted_channel() {
        let ink = InkClassifier::for_rows();
        assert!(!ink.is_ink(&Rgba([245, 255, 255, 255])));
        assert!(ink.is_ink(&Rgba([200, 200, 200, 255])));
    }

    #[test]
    fn transparent_pixels_are_background() {
        let ink = InkClassifier::for_rows();
        assert!(!ink.is_ink(&Rgba([0, 0, 0, 10])));
        assert!(ink.is_ink(&Rgba([0, 0, 0, 50])));
    }

    #[test]
    fn light_on_dark() {
        let ink = InkClassifier::dark_mode(50);
        assert!(ink.is_ink(&WHITE));
        assert!(!ink.is_ink(&Rgba([30, 30, 30, 255])));
    }

    #[test]
    fn deserializes_partial_config() {
        let ink: InkClassifier = serde_json::from_str(r#"{"threshold": 200}"#).unwrap();
        assert_eq!(ink.threshold, 200);
        assert_eq!(ink.polarity, Polarity::DarkOnLight);
    }
}
