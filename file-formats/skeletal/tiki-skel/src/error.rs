use thiserror::Error;

/// Error types for SKD/SKC decoding, encoding and validation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkelError {
    /// The buffer ended before a field could be read
    #[error("Truncated data: needed {size} bytes at offset {offset}, buffer is {len} bytes")]
    Truncated {
        offset: usize,
        size: usize,
        len: usize,
    },

    /// The magic/version pair has no codec
    #[error("Unsupported version {found} for magic '{magic}'")]
    UnsupportedVersion { magic: String, found: u32 },

    /// The bone parent graph is malformed
    #[error("Invalid hierarchy at bone '{bone}': {reason}")]
    InvalidHierarchy { bone: String, reason: String },

    /// A vertex weight list is unusable
    #[error("Invalid weights on surface {surface}, vertex {vertex}: {reason}")]
    InvalidWeights {
        surface: usize,
        vertex: usize,
        reason: String,
    },

    /// A vertex references more bones than the format allows
    #[error("Surface {surface}, vertex {vertex} has {count} influences (max {max})")]
    TooManyInfluences {
        surface: usize,
        vertex: usize,
        count: usize,
        max: usize,
    },

    /// Animation bone channels do not line up with the skeleton
    #[error("Channel count mismatch: skeleton has {expected} bones, animation has {found} bone channels")]
    ChannelCountMismatch { expected: usize, found: usize },

    /// A channel does not hold exactly one value per frame
    #[error("Channel '{channel}' has {found} keys, expected {expected}")]
    ChannelLengthMismatch {
        channel: String,
        expected: usize,
        found: usize,
    },

    /// Channel at `index` animates a different bone than the skeleton has at `index`
    #[error("Channel {index} animates '{channel}' but skeleton bone {index} is '{bone}'")]
    ChannelNameMismatch {
        index: usize,
        channel: String,
        bone: String,
    },

    /// The target version has no encoder, or cannot carry the data
    #[error("Cannot encode version {version}: {reason}")]
    EncodeNotSupported { version: u32, reason: String },

    /// A triangle references a vertex that does not exist
    #[error(
        "Surface {surface}, triangle {triangle} references vertex {index} (surface has {vertex_count})"
    )]
    InvalidTriangle {
        surface: usize,
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    /// LOD collapse tables are inconsistent with the surface
    #[error("Invalid collapse map on surface {surface}: {reason}")]
    InvalidCollapseMap { surface: usize, reason: String },

    /// A bone index outside the skeleton
    #[error("{what} references bone {index}, skeleton has {bone_count} bones")]
    InvalidBoneReference {
        what: String,
        index: usize,
        bone_count: usize,
    },

    /// A vertex morph references a morph target that does not exist
    #[error("Surface {surface}, vertex {vertex} references morph target {target} (model has {count})")]
    InvalidMorphTarget {
        surface: usize,
        vertex: usize,
        target: usize,
        count: usize,
    },

    /// Unknown on-disk bone type
    #[error("Bone '{bone}' has unknown type {value}")]
    InvalidBoneType { bone: String, value: i32 },

    /// A count, offset or index field holds an impossible value
    #[error("Invalid value {value} for field '{field}' at offset {offset}")]
    InvalidField {
        field: &'static str,
        value: i64,
        offset: usize,
    },

    /// A name does not fit its fixed-size field
    #[error("Name '{name}' does not fit in {max} bytes")]
    NameTooLong { name: String, max: usize },

    /// A name cannot be represented in Latin-1
    #[error("String '{value}' contains characters outside Latin-1")]
    InvalidString { value: String },

    /// Version 14 samples are not stored as packed per-frame floats
    #[error(
        "Frame {frame} samples at offset {offset}, packed layout expects {expected}: compressed channel encoding is not supported"
    )]
    UnsupportedQuantization {
        frame: usize,
        offset: usize,
        expected: usize,
    },

    /// Conversion options are unusable
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Result type using SkelError
pub type Result<T> = std::result::Result<T, SkelError>;
