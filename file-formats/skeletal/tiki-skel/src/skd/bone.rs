//! Bone records
//!
//! Each record is an 84-byte header followed by the type-specific base data
//! and two NUL-terminated string lists. All offsets in the header are relative
//! to the record start; the records are chained through `ofsEnd`.

use log::trace;

use crate::common::Transform;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Result, SkelError};
use crate::skeleton::{Bone, BoneKind, HoseParams, WORLD_BONE_NAME};

/// Size of the fixed part of a bone record
pub const BONE_HEADER_SIZE: usize = 84;

/// Size of the bone and parent name fields
pub const BONE_NAME_SIZE: usize = 32;

/// A bone record as stored, before parent names are resolved
#[derive(Debug, Clone, PartialEq)]
pub struct BoneRecord {
    pub name: String,
    pub parent: String,
    pub kind: BoneKind,
    pub bind: Transform,
    pub channel_names: Vec<String>,
    pub reference_names: Vec<String>,
    /// Record length, the distance to the next record
    pub ofs_end: usize,
}

impl BoneRecord {
    /// Parse a record starting at the reader's position; the reader is left
    /// at the start of the next record
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let start = reader.position();
        let name = reader.read_fixed_str(BONE_NAME_SIZE)?;
        let parent = reader.read_fixed_str(BONE_NAME_SIZE)?;
        let bone_type = reader.read_i32_le()?;
        let ofs_base_data = reader.read_count("ofsBaseData")?;
        let ofs_channel_names = reader.read_count("ofsChannelNames")?;
        let ofs_bone_names = reader.read_count("ofsBoneNames")?;
        let ofs_end_at = reader.position();
        let ofs_end = reader.read_count("ofsEnd")?;

        if ofs_end < BONE_HEADER_SIZE {
            return Err(SkelError::InvalidField {
                field: "ofsEnd",
                value: ofs_end as i64,
                offset: ofs_end_at,
            });
        }
        reader.check(start, ofs_end)?;

        let (kind, bind) = if ofs_base_data == 0 {
            (default_kind(&name, bone_type)?, Transform::IDENTITY)
        } else {
            reader.set_position(start + ofs_base_data);
            parse_base_data(reader, &name, bone_type)?
        };

        let regions = [ofs_channel_names, ofs_bone_names, ofs_end];
        let channel_names = parse_name_region(reader, start, ofs_channel_names, &regions)?;
        let reference_names = parse_name_region(reader, start, ofs_bone_names, &regions)?;

        reader.set_position(start + ofs_end);
        trace!(
            "Bone '{}' parent '{}' type {} ({} channel names)",
            name,
            parent,
            kind.name(),
            channel_names.len()
        );

        Ok(Self {
            name,
            parent,
            kind,
            bind,
            channel_names,
            reference_names,
            ofs_end,
        })
    }
}

fn default_kind(name: &str, bone_type: i32) -> Result<BoneKind> {
    Ok(match bone_type {
        0 => BoneKind::Rotation,
        1 => BoneKind::PosRot,
        2 => BoneKind::IkShoulder,
        3 => BoneKind::IkElbow,
        4 => BoneKind::IkWrist,
        5 => BoneKind::HoseRot(HoseParams::default()),
        6 => BoneKind::AvRot { length: 0.0 },
        7 => BoneKind::Zero,
        9 => BoneKind::World,
        10 => BoneKind::HoseRotBoth(HoseParams::default()),
        11 => BoneKind::HoseRotParent(HoseParams::default()),
        value => {
            return Err(SkelError::InvalidBoneType {
                bone: name.to_string(),
                value,
            });
        }
    })
}

fn parse_hose(reader: &mut ByteReader<'_>) -> Result<HoseParams> {
    Ok(HoseParams {
        bend_ratio: reader.read_f32_le()?,
        bend_max: reader.read_f32_le()?,
        spin_ratio: reader.read_f32_le()?,
    })
}

fn parse_base_data(
    reader: &mut ByteReader<'_>,
    name: &str,
    bone_type: i32,
) -> Result<(BoneKind, Transform)> {
    let kind = default_kind(name, bone_type)?;
    let result = match kind {
        BoneKind::Rotation | BoneKind::PosRot | BoneKind::IkElbow | BoneKind::IkWrist => {
            (kind, Transform::from_translation(reader.read_vec3()?))
        }
        BoneKind::IkShoulder => {
            let rotation = reader.read_quat()?;
            let offset = reader.read_vec3()?;
            (kind, Transform::new(offset, rotation))
        }
        BoneKind::HoseRot(_) => {
            let params = parse_hose(reader)?;
            (BoneKind::HoseRot(params), Transform::from_translation(reader.read_vec3()?))
        }
        BoneKind::HoseRotBoth(_) => {
            let params = parse_hose(reader)?;
            (
                BoneKind::HoseRotBoth(params),
                Transform::from_translation(reader.read_vec3()?),
            )
        }
        BoneKind::HoseRotParent(_) => {
            let params = parse_hose(reader)?;
            (
                BoneKind::HoseRotParent(params),
                Transform::from_translation(reader.read_vec3()?),
            )
        }
        BoneKind::AvRot { .. } => {
            let length = reader.read_f32_le()?;
            (
                BoneKind::AvRot { length },
                Transform::from_translation(reader.read_vec3()?),
            )
        }
        BoneKind::Zero | BoneKind::World => (kind, Transform::IDENTITY),
    };
    Ok(result)
}

/// Read the NUL-terminated strings between `offset` and the next region
fn parse_name_region(
    reader: &mut ByteReader<'_>,
    start: usize,
    offset: usize,
    regions: &[usize],
) -> Result<Vec<String>> {
    if offset == 0 {
        return Ok(Vec::new());
    }
    let end = regions
        .iter()
        .copied()
        .filter(|&r| r > offset)
        .min()
        .unwrap_or(offset);

    reader.set_position(start + offset);
    let mut names = Vec::new();
    while reader.position() < start + end {
        names.push(reader.read_cstr()?);
    }
    Ok(names)
}

fn base_data_size(kind: &BoneKind) -> usize {
    match kind {
        BoneKind::Rotation | BoneKind::PosRot | BoneKind::IkElbow | BoneKind::IkWrist => 12,
        BoneKind::IkShoulder => 28,
        BoneKind::HoseRot(_) | BoneKind::HoseRotBoth(_) | BoneKind::HoseRotParent(_) => 24,
        BoneKind::AvRot { .. } => 16,
        BoneKind::Zero | BoneKind::World => 0,
    }
}

fn write_base_data(writer: &mut ByteWriter, bone: &Bone) {
    match bone.kind {
        BoneKind::Rotation | BoneKind::PosRot | BoneKind::IkElbow | BoneKind::IkWrist => {
            writer.write_vec3(bone.bind.translation);
        }
        BoneKind::IkShoulder => {
            writer.write_quat(bone.bind.rotation);
            writer.write_vec3(bone.bind.translation);
        }
        BoneKind::HoseRot(p) | BoneKind::HoseRotBoth(p) | BoneKind::HoseRotParent(p) => {
            writer.write_f32_le(p.bend_ratio);
            writer.write_f32_le(p.bend_max);
            writer.write_f32_le(p.spin_ratio);
            writer.write_vec3(bone.bind.translation);
        }
        BoneKind::AvRot { length } => {
            writer.write_f32_le(length);
            writer.write_vec3(bone.bind.translation);
        }
        BoneKind::Zero | BoneKind::World => {}
    }
}

fn names_size(names: &[String]) -> usize {
    names.iter().map(|n| n.chars().count() + 1).sum()
}

/// Write one bone record in the canonical layout
///
/// Roots are written with the parent name `worldbone`.
pub fn write_bone(writer: &mut ByteWriter, bone: &Bone, parent: Option<&str>) -> Result<()> {
    let base_size = base_data_size(&bone.kind);
    let ofs_base_data = if base_size > 0 { BONE_HEADER_SIZE } else { 0 };

    let mut cursor = BONE_HEADER_SIZE + base_size;
    let ofs_channel_names = if bone.channel_names.is_empty() {
        0
    } else {
        cursor
    };
    cursor += names_size(&bone.channel_names);
    let ofs_bone_names = if bone.reference_names.is_empty() {
        0
    } else {
        cursor
    };
    cursor += names_size(&bone.reference_names);

    writer.write_fixed_str(&bone.name, BONE_NAME_SIZE)?;
    writer.write_fixed_str(parent.unwrap_or(WORLD_BONE_NAME), BONE_NAME_SIZE)?;
    writer.write_i32_le(bone.kind.type_value());
    writer.write_count("ofsBaseData", ofs_base_data)?;
    writer.write_count("ofsChannelNames", ofs_channel_names)?;
    writer.write_count("ofsBoneNames", ofs_bone_names)?;
    writer.write_count("ofsEnd", cursor)?;

    write_base_data(writer, bone);
    for name in bone.channel_names.iter().chain(&bone.reference_names) {
        writer.write_cstr(name)?;
    }
    Ok(())
}

/// Whether a parent name denotes the implicit world root
fn is_world_parent(parent: &str) -> bool {
    parent.is_empty() || parent.eq_ignore_ascii_case(WORLD_BONE_NAME)
}

/// Resolve parent names into indices
///
/// A parent must name an earlier bone. The empty name and `worldbone` denote a
/// root unless an earlier bone actually carries that name.
pub fn resolve_hierarchy(records: Vec<BoneRecord>) -> Result<Vec<Bone>> {
    let mut bones: Vec<Bone> = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        if bones.iter().any(|b| b.name == record.name) {
            return Err(SkelError::InvalidHierarchy {
                bone: record.name.clone(),
                reason: "duplicate bone name".to_string(),
            });
        }

        let earlier = bones
            .iter()
            .position(|b| b.name == record.parent)
            .or_else(|| {
                bones
                    .iter()
                    .position(|b| b.name.eq_ignore_ascii_case(&record.parent))
            });

        let parent = match earlier {
            Some(p) => Some(p),
            None if is_world_parent(&record.parent) => None,
            None => {
                let reason = if record.parent.eq_ignore_ascii_case(&record.name) {
                    "bone is its own parent".to_string()
                } else if let Some(later) = records[index + 1..]
                    .iter()
                    .position(|r| r.name.eq_ignore_ascii_case(&record.parent))
                {
                    format!(
                        "parent '{}' is defined later (bone {})",
                        record.parent,
                        index + 1 + later
                    )
                } else {
                    format!("unknown parent '{}'", record.parent)
                };
                return Err(SkelError::InvalidHierarchy {
                    bone: record.name.clone(),
                    reason,
                });
            }
        };

        bones.push(Bone {
            name: record.name.clone(),
            parent,
            kind: record.kind,
            bind: record.bind,
            channel_names: record.channel_names.clone(),
            reference_names: record.reference_names.clone(),
        });
    }
    Ok(bones)
}
