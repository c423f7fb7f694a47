use glam::Vec3;

use crate::animation::{AnimFlags, FrameInfo};
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Result, SkelError};
use crate::version::{AnimationVersion, SKC_MAGIC, magic_to_string};

/// Size of the SKC header
pub const SKC_HEADER_SIZE: usize = 48;

/// Size of one frame table entry
pub const FRAME_SIZE: usize = 48;

/// Size of one channel name
pub const CHANNEL_NAME_SIZE: usize = 32;

/// Size of one channel sample (four floats)
pub const SAMPLE_SIZE: usize = 16;

/// SKC file header
#[derive(Debug, Clone, PartialEq)]
pub struct SkcHeader {
    pub version: AnimationVersion,
    pub flags: AnimFlags,
    /// Total file length
    pub n_bytes_used: usize,
    pub frame_time: f32,
    pub total_delta: Vec3,
    pub total_angle_delta: f32,
    pub num_channels: usize,
    pub ofs_channel_names: usize,
    pub num_frames: usize,
}

impl SkcHeader {
    pub fn new(version: AnimationVersion) -> Self {
        Self {
            version,
            flags: AnimFlags::empty(),
            n_bytes_used: 0,
            frame_time: 0.05,
            total_delta: Vec3::ZERO,
            total_angle_delta: 0.0,
            num_channels: 0,
            ofs_channel_names: 0,
            num_frames: 0,
        }
    }

    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let magic: [u8; 4] = reader.read_array()?;
        let version_number = reader.read_u32_le()?;
        if magic != SKC_MAGIC {
            return Err(SkelError::UnsupportedVersion {
                magic: magic_to_string(magic),
                found: version_number,
            });
        }
        let version = AnimationVersion::from_version_number(version_number)?;

        Ok(Self {
            version,
            flags: AnimFlags::from_bits_retain(reader.read_u32_le()?),
            n_bytes_used: reader.read_count("nBytesUsed")?,
            frame_time: reader.read_f32_le()?,
            total_delta: reader.read_vec3()?,
            total_angle_delta: reader.read_f32_le()?,
            num_channels: reader.read_count("numChannels")?,
            ofs_channel_names: reader.read_count("ofsChannelNames")?,
            num_frames: reader.read_count("numFrames")?,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_bytes(&SKC_MAGIC);
        writer.write_u32_le(self.version.version_number());
        writer.write_u32_le(self.flags.bits());
        writer.write_count("nBytesUsed", self.n_bytes_used)?;
        writer.write_f32_le(self.frame_time);
        writer.write_vec3(self.total_delta);
        writer.write_f32_le(self.total_angle_delta);
        writer.write_count("numChannels", self.num_channels)?;
        writer.write_count("ofsChannelNames", self.ofs_channel_names)?;
        writer.write_count("numFrames", self.num_frames)?;
        Ok(())
    }
}

/// One frame table entry
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameRecord {
    pub info: FrameInfo,
    /// Absolute offset of the frame's samples
    pub ofs_channels: usize,
}

impl FrameRecord {
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let info = FrameInfo {
            bounds_min: reader.read_vec3()?,
            bounds_max: reader.read_vec3()?,
            radius: reader.read_f32_le()?,
            delta: reader.read_vec3()?,
            angle_delta: reader.read_f32_le()?,
        };
        let ofs_channels = reader.read_count("iOfsChannels")?;
        Ok(Self { info, ofs_channels })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_vec3(self.info.bounds_min);
        writer.write_vec3(self.info.bounds_max);
        writer.write_f32_le(self.info.radius);
        writer.write_vec3(self.info.delta);
        writer.write_f32_le(self.info.angle_delta);
        writer.write_count("iOfsChannels", self.ofs_channels)
    }
}
