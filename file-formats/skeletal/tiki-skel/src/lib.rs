//! Reader and writer for TIKI engine skeletal models (SKD) and skeletal
//! animations (SKC).
//!
//! Models are decoded into a [`SkeletalModel`] holding the bone hierarchy and
//! the skinned surfaces; animations are decoded against that skeleton into an
//! [`AnimationClip`] with one [`Channel`] per bone. Both directions go through
//! the same [`ConvertOptions`], so what [`import_model`] converts to host
//! space [`export_model`] converts back.
//!
//! Supported versions:
//!
//! | Magic  | Version | Read | Write |
//! |--------|---------|------|-------|
//! | `SKMD` | 5       | yes  | yes   |
//! | `SKMD` | 6       | yes  | yes   |
//! | `SKAN` | 13      | yes  | yes   |
//! | `SKAN` | 14      | yes  | yes   |
//!
//! # Examples
//!
//! ```rust,no_run
//! use tiki_skel::{ConvertOptions, import_animation, import_model};
//!
//! let options = ConvertOptions::default().with_axis_swap(true);
//! let model = import_model(&std::fs::read("player.skd")?, &options)?;
//! let clip = import_animation(&std::fs::read("run.skc")?, &model.skeleton, &options)?;
//! println!("{} bones, {} frames", model.skeleton.len(), clip.frame_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod animation;
pub mod common;
pub mod coordinate;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod mesh;
pub mod rest_pose;
pub mod skc;
pub mod skd;
pub mod skeleton;
pub mod validation;
pub mod version;

pub use animation::{AnimFlags, AnimationClip, Channel, ChannelTracks, FrameInfo, ValueCurve};
pub use common::Transform;
pub use coordinate::{ConvertOptions, Converter};
pub use dispatch::{FileFormat, detect_format};
pub use error::{Result, SkelError};
pub use mesh::{
    BoneWeight, HitBox, ModelInfo, MorphOffset, SkeletalModel, Surface, Triangle, Vertex,
};
pub use rest_pose::apply_clip_rest_pose;
pub use skeleton::{Bone, BoneKind, HoseParams, Skeleton};
pub use validation::{Adjustment, ValidationReport};
pub use version::{AnimationVersion, ModelVersion};

pub use glam;

use log::debug;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decode, convert and validate a model
pub fn import_model(data: &[u8], options: &ConvertOptions) -> Result<SkeletalModel> {
    import_model_with_report(data, options).map(|(model, _)| model)
}

/// Like [`import_model`], also returning what validation corrected
pub fn import_model_with_report(
    data: &[u8],
    options: &ConvertOptions,
) -> Result<(SkeletalModel, ValidationReport)> {
    let converter = Converter::new(*options)?;
    let decode = dispatch::model_decoder(data)?;
    let mut model = decode(data)?;
    converter.model_to_host(&mut model);
    let report = validation::validate_model(&mut model)?;
    debug!(
        "Imported model: {} bones, {} surfaces, {} adjustments",
        model.skeleton.len(),
        model.surfaces.len(),
        report.len()
    );
    Ok((model, report))
}

/// Validate, convert back to file space and encode a model
///
/// `version` defaults to [`ModelVersion::default`].
pub fn export_model(
    model: &SkeletalModel,
    version: Option<ModelVersion>,
    options: &ConvertOptions,
) -> Result<Vec<u8>> {
    let converter = Converter::new(*options)?;
    let version = version.unwrap_or_default();
    let encode = dispatch::model_encoder(version)?;

    let mut model = model.clone();
    validation::validate_model(&mut model)?;
    converter.model_to_file(&mut model);
    encode(&model, version)
}

/// Decode an animation against a host-space skeleton
///
/// The skeleton is the one returned by [`import_model`] with the same
/// options; bones whose channel lacks a track take it from its bind pose.
pub fn import_animation(
    data: &[u8],
    skeleton: &Skeleton,
    options: &ConvertOptions,
) -> Result<AnimationClip> {
    let converter = Converter::new(*options)?;
    let decode = dispatch::animation_decoder(data)?;

    let mut file_skeleton = skeleton.clone();
    converter.skeleton_to_file(&mut file_skeleton);
    let mut clip = decode(data, &file_skeleton)?;
    converter.clip_to_host(&mut clip);
    validation::validate_clip(&clip, skeleton)?;
    debug!(
        "Imported animation: {} channels, {} frames",
        clip.channels.len(),
        clip.frame_count()
    );
    Ok(clip)
}

/// Convert back to file space and encode an animation
///
/// `version` defaults to [`AnimationVersion::default`].
pub fn export_animation(
    clip: &AnimationClip,
    version: Option<AnimationVersion>,
    options: &ConvertOptions,
) -> Result<Vec<u8>> {
    let converter = Converter::new(*options)?;
    let version = version.unwrap_or_default();
    let encode = dispatch::animation_encoder(version)?;

    let mut clip = clip.clone();
    converter.clip_to_file(&mut clip);
    encode(&clip, version)
}
