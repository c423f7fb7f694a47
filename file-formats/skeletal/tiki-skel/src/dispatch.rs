//! Format detection and codec lookup
//!
//! Every supported `(magic, version)` pair has one entry in [`MODEL_CODECS`]
//! or [`ANIMATION_CODECS`]. An entry without an encoder is read-only: asking
//! to write it fails instead of falling back to another version.

use std::fmt;

use log::debug;

use crate::animation::AnimationClip;
use crate::cursor::ByteReader;
use crate::error::{Result, SkelError};
use crate::mesh::SkeletalModel;
use crate::skeleton::Skeleton;
use crate::version::{AnimationVersion, ModelVersion, SKC_MAGIC, SKD_MAGIC, magic_to_string};
use crate::{skc, skd};

/// Magic and version at the start of every file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u32,
}

impl FileHeader {
    /// Size of the common prefix
    pub const SIZE: usize = 8;

    /// Read the magic and version without interpreting anything else
    pub fn peek(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        Ok(Self {
            magic: reader.read_array()?,
            version: reader.read_u32_le()?,
        })
    }

    fn unsupported(&self) -> SkelError {
        SkelError::UnsupportedVersion {
            magic: magic_to_string(self.magic),
            found: self.version,
        }
    }
}

/// A detected file type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Model(ModelVersion),
    Animation(AnimationVersion),
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Model(v) => write!(f, "{v}"),
            FileFormat::Animation(v) => write!(f, "{v}"),
        }
    }
}

pub type ModelDecodeFn = fn(&[u8]) -> Result<SkeletalModel>;
pub type ModelEncodeFn = fn(&SkeletalModel, ModelVersion) -> Result<Vec<u8>>;
pub type AnimationDecodeFn = fn(&[u8], &Skeleton) -> Result<AnimationClip>;
pub type AnimationEncodeFn = fn(&AnimationClip, AnimationVersion) -> Result<Vec<u8>>;

/// Model codec table entry
#[derive(Debug, Clone, Copy)]
pub struct ModelCodec {
    pub magic: [u8; 4],
    pub version: ModelVersion,
    pub decode: ModelDecodeFn,
    pub encode: Option<ModelEncodeFn>,
}

/// Animation codec table entry
#[derive(Debug, Clone, Copy)]
pub struct AnimationCodec {
    pub magic: [u8; 4],
    pub version: AnimationVersion,
    pub decode: AnimationDecodeFn,
    pub encode: Option<AnimationEncodeFn>,
}

pub static MODEL_CODECS: [ModelCodec; 2] = [
    ModelCodec {
        magic: SKD_MAGIC,
        version: ModelVersion::V5,
        decode: skd::decode,
        encode: Some(skd::encode),
    },
    ModelCodec {
        magic: SKD_MAGIC,
        version: ModelVersion::V6,
        decode: skd::decode,
        encode: Some(skd::encode),
    },
];

pub static ANIMATION_CODECS: [AnimationCodec; 2] = [
    AnimationCodec {
        magic: SKC_MAGIC,
        version: AnimationVersion::V13,
        decode: skc::decode,
        encode: Some(skc::encode),
    },
    AnimationCodec {
        magic: SKC_MAGIC,
        version: AnimationVersion::V14,
        decode: skc::decode,
        encode: Some(skc::encode),
    },
];

fn find_model(header: &FileHeader) -> Option<&'static ModelCodec> {
    MODEL_CODECS
        .iter()
        .find(|c| c.magic == header.magic && c.version.version_number() == header.version)
}

fn find_animation(header: &FileHeader) -> Option<&'static AnimationCodec> {
    ANIMATION_CODECS
        .iter()
        .find(|c| c.magic == header.magic && c.version.version_number() == header.version)
}

/// Identify a buffer by its magic and version
pub fn detect_format(data: &[u8]) -> Result<FileFormat> {
    let header = FileHeader::peek(data)?;
    let format = if let Some(codec) = find_model(&header) {
        FileFormat::Model(codec.version)
    } else if let Some(codec) = find_animation(&header) {
        FileFormat::Animation(codec.version)
    } else {
        return Err(header.unsupported());
    };
    debug!("Detected {format} ({} bytes)", data.len());
    Ok(format)
}

/// Decoder for a model buffer
pub fn model_decoder(data: &[u8]) -> Result<ModelDecodeFn> {
    let header = FileHeader::peek(data)?;
    find_model(&header)
        .map(|c| c.decode)
        .ok_or_else(|| header.unsupported())
}

/// Decoder for an animation buffer
pub fn animation_decoder(data: &[u8]) -> Result<AnimationDecodeFn> {
    let header = FileHeader::peek(data)?;
    find_animation(&header)
        .map(|c| c.decode)
        .ok_or_else(|| header.unsupported())
}

/// Encoder for a model version
pub fn model_encoder(version: ModelVersion) -> Result<ModelEncodeFn> {
    MODEL_CODECS
        .iter()
        .find(|c| c.version == version)
        .and_then(|c| c.encode)
        .ok_or_else(|| SkelError::EncodeNotSupported {
            version: version.version_number(),
            reason: "no encoder for this version".to_string(),
        })
}

/// Encoder for an animation version
pub fn animation_encoder(version: AnimationVersion) -> Result<AnimationEncodeFn> {
    ANIMATION_CODECS
        .iter()
        .find(|c| c.version == version)
        .and_then(|c| c.encode)
        .ok_or_else(|| SkelError::EncodeNotSupported {
            version: version.version_number(),
            reason: "no encoder for this version".to_string(),
        })
}
