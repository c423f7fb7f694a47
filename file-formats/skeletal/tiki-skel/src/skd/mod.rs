//! SKD skeletal model codec (versions 5 and 6)
//!
//! Decoding walks the header's offset tables; encoding always writes the
//! canonical layout: header, surfaces, bones, hit boxes, morph target names,
//! with every absent section at offset 0. A file already in that layout
//! re-encodes to identical bytes.

pub mod bone;
pub mod header;
pub mod surface;

use log::{debug, warn};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Result, SkelError};
use crate::mesh::{HitBox, ModelInfo, SkeletalModel};
use crate::skeleton::Skeleton;
use crate::version::ModelVersion;

pub use bone::{BONE_HEADER_SIZE, BoneRecord};
pub use header::SkdHeader;
pub use surface::{SURFACE_HEADER_SIZE, SurfaceHeader};

/// Decode an SKD file into a model in file coordinates
///
/// Vertex positions are derived from the weights and the bind skeleton.
pub fn decode(data: &[u8]) -> Result<SkeletalModel> {
    let mut reader = ByteReader::new(data);
    let header = SkdHeader::parse(&mut reader)?;
    debug!(
        "{} '{}': {} surfaces, {} bones, {} boxes, {} morph targets",
        header.version,
        header.name,
        header.num_surfaces,
        header.num_bones,
        header.num_boxes,
        header.num_morph_targets
    );
    if header.ofs_end != data.len() {
        warn!(
            "SKD header ofsEnd is {} but the buffer is {} bytes",
            header.ofs_end,
            data.len()
        );
    }

    let allow_morphs = header.version.has_morph_targets();
    let mut surfaces =
        Vec::with_capacity(header.num_surfaces.min(data.len() / SURFACE_HEADER_SIZE));
    reader.set_position(header.ofs_surfaces);
    for index in 0..header.num_surfaces {
        surfaces.push(surface::parse_surface(&mut reader, index, allow_morphs)?);
    }
    debug!("Parsed {} surfaces", surfaces.len());

    let mut records = Vec::with_capacity(header.num_bones.min(data.len() / BONE_HEADER_SIZE));
    reader.set_position(header.ofs_bones);
    for _ in 0..header.num_bones {
        records.push(BoneRecord::parse(&mut reader)?);
    }
    let skeleton = Skeleton::new(bone::resolve_hierarchy(records)?);
    debug!("Parsed {} bones", skeleton.len());

    let mut hit_boxes = Vec::new();
    if header.num_boxes > 0 {
        reader.set_position(header.ofs_boxes);
        reader.check(header.ofs_boxes, header.num_boxes.saturating_mul(4))?;
        for _ in 0..header.num_boxes {
            hit_boxes.push(HitBox {
                bone: reader.read_count("hit box bone")?,
            });
        }
    }

    let mut morph_targets = Vec::new();
    if header.num_morph_targets > 0 {
        reader.set_position(header.ofs_morph_targets);
        for _ in 0..header.num_morph_targets {
            morph_targets.push(reader.read_cstr()?);
        }
    }

    let mut model = SkeletalModel {
        skeleton,
        surfaces,
        info: ModelInfo {
            name: header.name,
            lod_index: header.lod_index,
            hit_boxes,
            morph_targets,
            scale: header.scale,
        },
    };
    model.update_positions();
    Ok(model)
}

/// Refuse data the target version cannot carry
fn check_encodable(model: &SkeletalModel, version: ModelVersion) -> Result<()> {
    if version.has_morph_targets() {
        return Ok(());
    }
    let reason = if !model.info.morph_targets.is_empty() {
        Some("version 5 has no morph target table")
    } else if model.uses_morphs() {
        Some("version 5 cannot store vertex morphs")
    } else if model.info.scale.to_bits() != 1.0f32.to_bits() {
        Some("version 5 has no model scale")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(SkelError::EncodeNotSupported {
            version: version.version_number(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Encode a model (already in file coordinates) as `version`
pub fn encode(model: &SkeletalModel, version: ModelVersion) -> Result<Vec<u8>> {
    check_encodable(model, version)?;

    let mut header = SkdHeader::new(version);
    header.name.clone_from(&model.info.name);
    header.lod_index = model.info.lod_index;
    header.scale = model.info.scale;
    header.num_surfaces = model.surfaces.len();
    header.num_bones = model.skeleton.len();
    header.num_boxes = model.info.hit_boxes.len();
    header.num_morph_targets = model.info.morph_targets.len();

    let mut writer = ByteWriter::with_capacity(version.header_size());
    // Header is written twice: once to reserve its space, once with the offsets
    header.write(&mut writer)?;

    if !model.surfaces.is_empty() {
        header.ofs_surfaces = writer.position();
        for surface in &model.surfaces {
            surface::write_surface(&mut writer, surface)?;
        }
    }

    if !model.skeleton.is_empty() {
        header.ofs_bones = writer.position();
        for bone in model.skeleton.iter() {
            let parent = bone
                .parent
                .and_then(|p| model.skeleton.get(p))
                .map(|p| p.name.as_str());
            bone::write_bone(&mut writer, bone, parent)?;
        }
    }

    if !model.info.hit_boxes.is_empty() {
        header.ofs_boxes = writer.position();
        for hit_box in &model.info.hit_boxes {
            writer.write_count("hit box bone", hit_box.bone)?;
        }
    }

    if !model.info.morph_targets.is_empty() {
        header.ofs_morph_targets = writer.position();
        for name in &model.info.morph_targets {
            writer.write_cstr(name)?;
        }
    }

    header.ofs_end = writer.len();
    writer.set_position(0);
    header.write(&mut writer)?;

    debug!(
        "Encoded {} '{}': {} bytes",
        version,
        header.name,
        header.ofs_end
    );
    Ok(writer.into_inner())
}
