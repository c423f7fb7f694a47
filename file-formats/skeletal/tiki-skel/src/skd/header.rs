use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Result, SkelError};
use crate::mesh::LOD_INDEX_COUNT;
use crate::version::{ModelVersion, SKD_MAGIC, magic_to_string};

/// Size of the model name field
pub const MODEL_NAME_SIZE: usize = 64;

/// SKD file header
///
/// Version 5 stops after `ofs_boxes`; version 6 appends the morph target
/// table and a model scale.
#[derive(Debug, Clone, PartialEq)]
pub struct SkdHeader {
    pub version: ModelVersion,
    pub name: String,
    pub num_surfaces: usize,
    pub num_bones: usize,
    pub ofs_bones: usize,
    pub ofs_surfaces: usize,
    /// Total file length
    pub ofs_end: usize,
    pub lod_index: [i32; LOD_INDEX_COUNT],
    pub num_boxes: usize,
    pub ofs_boxes: usize,
    pub num_morph_targets: usize,
    pub ofs_morph_targets: usize,
    pub scale: f32,
}

impl SkdHeader {
    /// An empty header for `version`, offsets to be filled by the encoder
    pub fn new(version: ModelVersion) -> Self {
        Self {
            version,
            name: String::new(),
            num_surfaces: 0,
            num_bones: 0,
            ofs_bones: 0,
            ofs_surfaces: 0,
            ofs_end: 0,
            lod_index: [0; LOD_INDEX_COUNT],
            num_boxes: 0,
            ofs_boxes: 0,
            num_morph_targets: 0,
            ofs_morph_targets: 0,
            scale: 1.0,
        }
    }

    /// Parse the header at the reader's position
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let magic: [u8; 4] = reader.read_array()?;
        let version_number = reader.read_u32_le()?;
        if magic != SKD_MAGIC {
            return Err(SkelError::UnsupportedVersion {
                magic: magic_to_string(magic),
                found: version_number,
            });
        }
        let version = ModelVersion::from_version_number(version_number)?;

        let name = reader.read_fixed_str(MODEL_NAME_SIZE)?;
        let num_surfaces = reader.read_count("numSurfaces")?;
        let num_bones = reader.read_count("numBones")?;
        let ofs_bones = reader.read_count("ofsBones")?;
        let ofs_surfaces = reader.read_count("ofsSurfaces")?;
        let ofs_end = reader.read_count("ofsEnd")?;

        let mut lod_index = [0; LOD_INDEX_COUNT];
        for lod in &mut lod_index {
            *lod = reader.read_i32_le()?;
        }

        let num_boxes = reader.read_count("numBoxes")?;
        let ofs_boxes = reader.read_count("ofsBoxes")?;

        let (num_morph_targets, ofs_morph_targets, scale) = if version.has_morph_targets() {
            (
                reader.read_count("numMorphTargets")?,
                reader.read_count("ofsMorphTargets")?,
                reader.read_f32_le()?,
            )
        } else {
            (0, 0, 1.0)
        };

        Ok(Self {
            version,
            name,
            num_surfaces,
            num_bones,
            ofs_bones,
            ofs_surfaces,
            ofs_end,
            lod_index,
            num_boxes,
            ofs_boxes,
            num_morph_targets,
            ofs_morph_targets,
            scale,
        })
    }

    /// Write the header at the writer's position
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_bytes(&SKD_MAGIC);
        writer.write_u32_le(self.version.version_number());
        writer.write_fixed_str(&self.name, MODEL_NAME_SIZE)?;
        writer.write_count("numSurfaces", self.num_surfaces)?;
        writer.write_count("numBones", self.num_bones)?;
        writer.write_count("ofsBones", self.ofs_bones)?;
        writer.write_count("ofsSurfaces", self.ofs_surfaces)?;
        writer.write_count("ofsEnd", self.ofs_end)?;
        for lod in self.lod_index {
            writer.write_i32_le(lod);
        }
        writer.write_count("numBoxes", self.num_boxes)?;
        writer.write_count("ofsBoxes", self.ofs_boxes)?;

        if self.version.has_morph_targets() {
            writer.write_count("numMorphTargets", self.num_morph_targets)?;
            writer.write_count("ofsMorphTargets", self.ofs_morph_targets)?;
            writer.write_f32_le(self.scale);
        }
        Ok(())
    }
}
