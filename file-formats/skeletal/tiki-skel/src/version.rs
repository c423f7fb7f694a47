//! Format versions for SKD models and SKC animations

use std::fmt;

use crate::error::{Result, SkelError};

/// Magic signature for SKD files ("SKMD")
pub const SKD_MAGIC: [u8; 4] = *b"SKMD";

/// Magic signature for SKC files ("SKAN")
pub const SKC_MAGIC: [u8; 4] = *b"SKAN";

/// Render a magic for error messages
pub fn magic_to_string(magic: [u8; 4]) -> String {
    magic
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                char::from(b)
            } else {
                '?'
            }
        })
        .collect()
}

/// SKD model versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ModelVersion {
    /// Version 5 (140-byte header)
    V5,

    /// Version 6: morph targets and a model scale
    #[default]
    V6,
}

impl ModelVersion {
    /// Returns the version number stored in the header
    pub fn version_number(self) -> u32 {
        match self {
            ModelVersion::V5 => 5,
            ModelVersion::V6 => 6,
        }
    }

    /// Detects the model version from the header version number
    pub fn from_version_number(version: u32) -> Result<Self> {
        match version {
            5 => Ok(ModelVersion::V5),
            6 => Ok(ModelVersion::V6),
            _ => Err(SkelError::UnsupportedVersion {
                magic: magic_to_string(SKD_MAGIC),
                found: version,
            }),
        }
    }

    /// Size of the file header in bytes
    pub fn header_size(self) -> usize {
        match self {
            ModelVersion::V5 => 140,
            ModelVersion::V6 => 152,
        }
    }

    /// Whether morph targets, per-vertex morphs and the scale field exist
    pub fn has_morph_targets(self) -> bool {
        self >= ModelVersion::V6
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SKD v{}", self.version_number())
    }
}

/// SKC animation versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum AnimationVersion {
    /// Version 13: per-frame samples wherever `iOfsChannels` points
    #[default]
    V13,

    /// Version 14: same records, samples packed after the frame table
    V14,
}

impl AnimationVersion {
    /// Returns the version number stored in the header
    pub fn version_number(self) -> u32 {
        match self {
            AnimationVersion::V13 => 13,
            AnimationVersion::V14 => 14,
        }
    }

    /// Detects the animation version from the header version number
    pub fn from_version_number(version: u32) -> Result<Self> {
        match version {
            13 => Ok(AnimationVersion::V13),
            14 => Ok(AnimationVersion::V14),
            _ => Err(SkelError::UnsupportedVersion {
                magic: magic_to_string(SKC_MAGIC),
                found: version,
            }),
        }
    }

    /// Whether the samples must sit packed right after the frame table
    pub fn requires_packed_samples(self) -> bool {
        matches!(self, AnimationVersion::V14)
    }
}

impl fmt::Display for AnimationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SKC v{}", self.version_number())
    }
}
