//! Filter selection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of the filter applied to every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterType {
    /// Identity: frames pass through untouched.
    #[default]
    Passthrough,
    Grayscale,
    Invert,
    Sepia,
    /// Left half mirrored onto the right half.
    MirrorTwo,
    /// Red and blue channels pulled apart horizontally.
    Chroma,
}

impl FilterType {
    pub const ALL: [FilterType; 6] = [
        FilterType::Passthrough,
        FilterType::Grayscale,
        FilterType::Invert,
        FilterType::Sepia,
        FilterType::MirrorTwo,
        FilterType::Chroma,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Grayscale => "grayscale",
            Self::Invert => "invert",
            Self::Sepia => "sepia",
            Self::MirrorTwo => "mirror-two",
            Self::Chroma => "chroma",
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Passthrough)
    }
}

impl std::fmt::Display for FilterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown filter name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter {0:?}")]
pub struct UnknownFilter(pub String);

impl FromStr for FilterType {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|filter| filter.as_str() == wanted)
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}
