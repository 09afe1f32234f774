//! Export quality presets.

use serde::{Deserialize, Serialize};

use crate::frame::PixelFormat;

/// Named export quality preset.
///
/// Variants are declared in ascending quality, so `Ord` ranks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportPreset {
    LowQuality,
    MediumQuality,
    #[serde(rename = "640x480")]
    Preset640x480,
    #[serde(rename = "1280x720")]
    Preset1280x720,
    #[serde(rename = "1920x1080")]
    Preset1920x1080,
    #[serde(rename = "3840x2160")]
    Preset3840x2160,
    HighestQuality,
}

impl ExportPreset {
    pub const ALL: [ExportPreset; 7] = [
        ExportPreset::LowQuality,
        ExportPreset::MediumQuality,
        ExportPreset::Preset640x480,
        ExportPreset::Preset1280x720,
        ExportPreset::Preset1920x1080,
        ExportPreset::Preset3840x2160,
        ExportPreset::HighestQuality,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowQuality => "low-quality",
            Self::MediumQuality => "medium-quality",
            Self::Preset640x480 => "640x480",
            Self::Preset1280x720 => "1280x720",
            Self::Preset1920x1080 => "1920x1080",
            Self::Preset3840x2160 => "3840x2160",
            Self::HighestQuality => "highest-quality",
        }
    }

    /// Largest frame the preset accepts, as (long edge, short edge).
    ///
    /// `None` means any size.
    pub fn max_dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Preset640x480 => Some((640, 480)),
            Self::Preset1280x720 => Some((1280, 720)),
            Self::Preset1920x1080 => Some((1920, 1080)),
            Self::Preset3840x2160 => Some((3840, 2160)),
            Self::LowQuality | Self::MediumQuality | Self::HighestQuality => None,
        }
    }

    /// Whether a source of this format fits the preset, in either orientation.
    pub fn accepts(&self, format: PixelFormat) -> bool {
        match self.max_dimensions() {
            None => true,
            Some((long, short)) => {
                let src_long = format.width.max(format.height);
                let src_short = format.width.min(format.height);
                src_long <= long && src_short <= short
            }
        }
    }

    /// x264 constant rate factor used for this preset.
    pub fn crf(&self) -> u8 {
        match self {
            Self::LowQuality => 32,
            Self::MediumQuality => 26,
            Self::Preset640x480 | Self::Preset1280x720 => 23,
            Self::Preset1920x1080 | Self::Preset3840x2160 => 20,
            Self::HighestQuality => 17,
        }
    }

    /// The highest-quality preset in a list.
    pub fn best_of(presets: &[ExportPreset]) -> Option<ExportPreset> {
        presets.iter().copied().max()
    }
}

impl std::fmt::Display for ExportPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_of_prefers_highest_quality() {
        let presets = [
            ExportPreset::Preset1280x720,
            ExportPreset::HighestQuality,
            ExportPreset::LowQuality,
        ];
        assert_eq!(
            ExportPreset::best_of(&presets),
            Some(ExportPreset::HighestQuality)
        );
        assert_eq!(ExportPreset::best_of(&[]), None);
    }

    #[test]
    fn test_accepts_either_orientation() {
        let portrait = PixelFormat::new(720, 1280);
        assert!(ExportPreset::Preset1280x720.accepts(portrait));
        assert!(!ExportPreset::Preset640x480.accepts(portrait));
        assert!(ExportPreset::HighestQuality.accepts(PixelFormat::new(8000, 8000)));
    }

    #[test]
    fn test_higher_quality_means_lower_crf() {
        assert!(ExportPreset::HighestQuality.crf() < ExportPreset::LowQuality.crf());
    }
}
