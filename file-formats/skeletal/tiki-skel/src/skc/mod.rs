//! SKC skeletal animation codec (versions 13 and 14)
//!
//! Both versions share one layout: header, frame table, frame-major samples
//! (four floats per channel) at each frame's `iOfsChannels`, then the channel
//! name table. Version 14 files must keep the samples packed directly after
//! the frame table; any other placement is a channel encoding this crate does
//! not decode and is reported as [`SkelError::UnsupportedQuantization`].
//!
//! Channels are matched to the skeleton by name before any sample is read:
//! the bone channels, grouped per bone in order of first appearance, must
//! line up one to one with the skeleton's bones.

pub mod channel;
pub mod header;

use glam::{Quat, Vec4};
use log::debug;

use crate::animation::{AnimationClip, Channel, ChannelTracks, ValueCurve};
use crate::common::Transform;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Result, SkelError};
use crate::skeleton::Skeleton;
use crate::version::AnimationVersion;

pub use channel::{BoneChannels, ChannelKind, ChannelLayout};
pub use header::{FrameRecord, SkcHeader};

use header::{CHANNEL_NAME_SIZE, FRAME_SIZE, SAMPLE_SIZE, SKC_HEADER_SIZE};

/// Everything up to the sample data
#[derive(Debug, Clone, PartialEq)]
pub struct SkcPreamble {
    pub header: SkcHeader,
    pub frames: Vec<FrameRecord>,
    pub channel_names: Vec<String>,
}

/// Parse the header, frame table and channel names without touching samples
pub fn parse_preamble(data: &[u8]) -> Result<SkcPreamble> {
    let mut reader = ByteReader::new(data);
    let header = SkcHeader::parse(&mut reader)?;
    debug!(
        "{}: {} frames, {} channels, frame time {}",
        header.version, header.num_frames, header.num_channels, header.frame_time
    );

    reader.check(SKC_HEADER_SIZE, header.num_frames.saturating_mul(FRAME_SIZE))?;
    let mut frames = Vec::with_capacity(header.num_frames);
    for _ in 0..header.num_frames {
        frames.push(FrameRecord::parse(&mut reader)?);
    }

    let mut channel_names = Vec::new();
    if header.num_channels > 0 {
        reader.check(
            header.ofs_channel_names,
            header.num_channels.saturating_mul(CHANNEL_NAME_SIZE),
        )?;
        reader.set_position(header.ofs_channel_names);
        channel_names.reserve_exact(header.num_channels);
        for _ in 0..header.num_channels {
            channel_names.push(reader.read_fixed_str(CHANNEL_NAME_SIZE)?);
        }
    }

    Ok(SkcPreamble {
        header,
        frames,
        channel_names,
    })
}

/// Check that the bone channels line up with the skeleton
pub fn match_skeleton(layout: &ChannelLayout, skeleton: &Skeleton) -> Result<()> {
    if layout.bones.len() != skeleton.len() {
        return Err(SkelError::ChannelCountMismatch {
            expected: skeleton.len(),
            found: layout.bones.len(),
        });
    }
    for (index, (channels, bone)) in layout.bones.iter().zip(skeleton.iter()).enumerate() {
        if !channels.bone.eq_ignore_ascii_case(&bone.name) {
            return Err(SkelError::ChannelNameMismatch {
                index,
                channel: channels.bone.clone(),
                bone: bone.name.clone(),
            });
        }
    }
    Ok(())
}

/// Offset of frame `frame`'s samples in the packed layout
fn packed_offset(num_frames: usize, num_channels: usize, frame: usize) -> usize {
    SKC_HEADER_SIZE + num_frames * FRAME_SIZE + frame * num_channels * SAMPLE_SIZE
}

/// Version 14 keeps the samples packed between the frame table and the names
fn check_packed_layout(preamble: &SkcPreamble) -> Result<()> {
    let num_frames = preamble.frames.len();
    let num_channels = preamble.channel_names.len();
    for (index, frame) in preamble.frames.iter().enumerate() {
        let expected = packed_offset(num_frames, num_channels, index);
        if frame.ofs_channels != expected {
            return Err(SkelError::UnsupportedQuantization {
                frame: index,
                offset: frame.ofs_channels,
                expected,
            });
        }
    }

    let stride = num_channels * SAMPLE_SIZE;
    let samples_start = packed_offset(num_frames, num_channels, 0);
    let ofs_names = preamble.header.ofs_channel_names;
    if stride == 0 || ofs_names < samples_start {
        return Ok(());
    }
    let region = ofs_names - samples_start;
    if region == num_frames * stride {
        return Ok(());
    }
    if region % stride == 0 {
        Err(SkelError::ChannelLengthMismatch {
            channel: preamble.channel_names[0].clone(),
            expected: num_frames,
            found: region / stride,
        })
    } else {
        Err(SkelError::UnsupportedQuantization {
            frame: region / stride,
            offset: ofs_names,
            expected: samples_start + num_frames * stride,
        })
    }
}

/// Read the samples, indexed `[channel][frame]`
fn read_samples(data: &[u8], preamble: &SkcPreamble) -> Result<Vec<Vec<Vec4>>> {
    let num_channels = preamble.channel_names.len();
    let frame_size = num_channels.saturating_mul(SAMPLE_SIZE);
    let mut reader = ByteReader::new(data);
    // Frames may share sample blocks, but never hold more samples than the file
    reader.check(0, frame_size.saturating_mul(preamble.frames.len()))?;
    for frame in &preamble.frames {
        reader.check(frame.ofs_channels, frame_size)?;
    }

    let mut samples = vec![Vec::with_capacity(preamble.frames.len()); num_channels];
    for frame in &preamble.frames {
        reader.set_position(frame.ofs_channels);
        for channel in &mut samples {
            channel.push(reader.read_vec4()?);
        }
    }
    Ok(samples)
}

/// Decode an SKC file against `skeleton`, in file coordinates
pub fn decode(data: &[u8], skeleton: &Skeleton) -> Result<AnimationClip> {
    let preamble = parse_preamble(data)?;
    let layout = ChannelLayout::from_names(&preamble.channel_names);
    match_skeleton(&layout, skeleton)?;
    debug!(
        "Matched {} bone channels and {} curves",
        layout.bones.len(),
        layout.curves.len()
    );

    if preamble.header.version.requires_packed_samples() {
        check_packed_layout(&preamble)?;
    }
    let samples = read_samples(data, &preamble)?;

    let num_frames = preamble.frames.len();
    let channels = layout
        .bones
        .iter()
        .zip(skeleton.iter())
        .map(|(group, bone)| {
            let keys = (0..num_frames)
                .map(|frame| {
                    let rotation = group
                        .rotation
                        .map_or(bone.bind.rotation, |c| Quat::from_vec4(samples[c][frame]));
                    let translation = group
                        .position
                        .map_or(bone.bind.translation, |c| samples[c][frame].truncate());
                    Transform::new(translation, rotation)
                })
                .collect();
            Channel::new(bone.name.clone(), group.tracks(), keys)
        })
        .collect();

    let curves = layout
        .curves
        .iter()
        .map(|(name, index)| ValueCurve {
            name: name.clone(),
            values: samples[*index].clone(),
        })
        .collect();

    let header = preamble.header;
    Ok(AnimationClip {
        name: String::new(),
        flags: header.flags,
        frame_time: header.frame_time,
        total_delta: header.total_delta,
        total_angle_delta: header.total_angle_delta,
        frames: preamble.frames.iter().map(|f| f.info).collect(),
        channels,
        curves,
    })
}

/// On-disk channel list of a clip: each bone's rotation then position, then curves
fn file_channels(clip: &AnimationClip) -> Vec<(String, ChannelSource<'_>)> {
    let mut out = Vec::new();
    for channel in &clip.channels {
        if channel.has_rotation() {
            out.push((
                channel::channel_name(&channel.bone, ChannelTracks::ROTATION),
                ChannelSource::Rotation(channel),
            ));
        }
        if channel.has_position() {
            out.push((
                channel::channel_name(&channel.bone, ChannelTracks::POSITION),
                ChannelSource::Position(channel),
            ));
        }
    }
    for curve in &clip.curves {
        out.push((curve.name.clone(), ChannelSource::Curve(curve)));
    }
    out
}

enum ChannelSource<'a> {
    Rotation(&'a Channel),
    Position(&'a Channel),
    Curve(&'a ValueCurve),
}

impl ChannelSource<'_> {
    fn sample(&self, frame: usize) -> Option<Vec4> {
        match self {
            ChannelSource::Rotation(c) => c.keys.get(frame).map(|k| Vec4::from(k.rotation)),
            ChannelSource::Position(c) => c.keys.get(frame).map(|k| k.translation.extend(0.0)),
            ChannelSource::Curve(c) => c.values.get(frame).copied(),
        }
    }

    fn len(&self) -> usize {
        match self {
            ChannelSource::Rotation(c) | ChannelSource::Position(c) => c.keys.len(),
            ChannelSource::Curve(c) => c.values.len(),
        }
    }
}

/// Encode a clip (already in file coordinates) as `version`
pub fn encode(clip: &AnimationClip, version: AnimationVersion) -> Result<Vec<u8>> {
    let channels = file_channels(clip);
    let num_frames = clip.frames.len();
    for (name, source) in &channels {
        if source.len() != num_frames {
            return Err(SkelError::ChannelLengthMismatch {
                channel: name.clone(),
                expected: num_frames,
                found: source.len(),
            });
        }
    }

    let mut header = SkcHeader::new(version);
    header.flags = clip.flags;
    header.frame_time = clip.frame_time;
    header.total_delta = clip.total_delta;
    header.total_angle_delta = clip.total_angle_delta;
    header.num_channels = channels.len();
    header.num_frames = num_frames;

    let samples_start = SKC_HEADER_SIZE + num_frames * FRAME_SIZE;
    let frame_stride = channels.len() * SAMPLE_SIZE;
    header.ofs_channel_names = samples_start + num_frames * frame_stride;
    header.n_bytes_used = header.ofs_channel_names + channels.len() * CHANNEL_NAME_SIZE;

    let mut writer = ByteWriter::with_capacity(header.n_bytes_used);
    header.write(&mut writer)?;

    for (index, info) in clip.frames.iter().enumerate() {
        let ofs_channels = if channels.is_empty() {
            0
        } else {
            samples_start + index * frame_stride
        };
        FrameRecord {
            info: *info,
            ofs_channels,
        }
        .write(&mut writer)?;
    }

    for frame in 0..num_frames {
        for (_, source) in &channels {
            writer.write_vec4(source.sample(frame).unwrap_or(Vec4::ZERO));
        }
    }

    for (name, _) in &channels {
        writer.write_fixed_str(name, CHANNEL_NAME_SIZE)?;
    }

    debug!(
        "Encoded {}: {} frames, {} channels, {} bytes",
        version,
        num_frames,
        channels.len(),
        writer.len()
    );
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimFlags, FrameInfo};
    use crate::skeleton::{Bone, BoneKind};
    use glam::Vec3;

    fn skeleton() -> Skeleton {
        Skeleton::new(vec![
            Bone::new(
                "Bip01",
                None,
                BoneKind::PosRot,
                Transform::from_translation(Vec3::Z),
            ),
            Bone::new(
                "Bip01 Head",
                Some(0),
                BoneKind::Rotation,
                Transform::from_translation(Vec3::X),
            ),
        ])
    }

    fn clip() -> AnimationClip {
        let frames = 3;
        let spin = |f: usize| Quat::from_rotation_z(f as f32 * 0.1);
        AnimationClip {
            name: "walk".into(),
            flags: AnimFlags::HASDELTA,
            frame_time: 0.05,
            total_delta: Vec3::new(12.0, 0.0, 0.0),
            total_angle_delta: 0.0,
            frames: (0..frames)
                .map(|f| FrameInfo {
                    bounds_min: Vec3::splat(-1.0),
                    bounds_max: Vec3::splat(1.0),
                    radius: 1.7,
                    delta: Vec3::new(4.0, 0.0, 0.0),
                    angle_delta: f as f32,
                })
                .collect(),
            channels: vec![
                Channel::new(
                    "Bip01",
                    ChannelTracks::all(),
                    (0..frames)
                        .map(|f| Transform::new(Vec3::new(f as f32, 0.0, 1.0), spin(f)))
                        .collect(),
                ),
                Channel::new(
                    "Bip01 Head",
                    ChannelTracks::ROTATION,
                    (0..frames).map(|f| Transform::new(Vec3::X, spin(f))).collect(),
                ),
            ],
            curves: vec![ValueCurve {
                name: "jaw_open".into(),
                values: vec![Vec4::new(0.5, 0.0, 0.0, 0.0); frames],
            }],
        }
    }

    #[test]
    fn test_v13_roundtrip() {
        let clip = clip();
        let bytes = encode(&clip, AnimationVersion::V13).unwrap();
        let preamble = parse_preamble(&bytes).unwrap();
        assert_eq!(
            preamble.channel_names,
            vec!["Bip01 rot", "Bip01 pos", "Bip01 Head rot", "jaw_open"]
        );
        assert_eq!(preamble.header.n_bytes_used, bytes.len());

        let decoded = decode(&bytes, &skeleton()).unwrap();
        assert_eq!(decoded.channels, clip.channels);
        assert_eq!(decoded.curves, clip.curves);
        assert_eq!(decoded.frames, clip.frames);
        assert_eq!(encode(&decoded, AnimationVersion::V13).unwrap(), bytes);
    }

    #[test]
    fn test_missing_track_uses_bind() {
        let bytes = encode(&clip(), AnimationVersion::V13).unwrap();
        let decoded = decode(&bytes, &skeleton()).unwrap();
        assert!(decoded.channels[1].keys.iter().all(|k| k.translation == Vec3::X));
        assert!(!decoded.channels[1].has_position());
    }

    #[test]
    fn test_skeleton_mismatch() {
        let bytes = encode(&clip(), AnimationVersion::V13).unwrap();

        let mut bigger = skeleton();
        bigger.bones.push(Bone::new(
            "Bip01 Tail",
            Some(0),
            BoneKind::Rotation,
            Transform::IDENTITY,
        ));
        assert_eq!(
            decode(&bytes, &bigger).unwrap_err(),
            SkelError::ChannelCountMismatch { expected: 3, found: 2 }
        );

        let mut renamed = skeleton();
        renamed.bones[1].name = "Bip01 Neck".into();
        assert!(matches!(
            decode(&bytes, &renamed),
            Err(SkelError::ChannelNameMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_v14_shares_the_v13_layout() {
        let v13 = encode(&clip(), AnimationVersion::V13).unwrap();
        let v14 = encode(&clip(), AnimationVersion::V14).unwrap();
        assert_eq!(&v14[4..8], &14u32.to_le_bytes());
        assert_eq!(v13[8..], v14[8..]);

        let decoded = decode(&v14, &skeleton()).unwrap();
        assert_eq!(decoded.channels, clip().channels);
        assert_eq!(encode(&decoded, AnimationVersion::V14).unwrap(), v14);
    }

    #[test]
    fn test_v14_samples_away_from_frame_table() {
        let mut bytes = encode(&clip(), AnimationVersion::V14).unwrap();
        // iOfsChannels of frame 1 is the last field of its record
        let field = SKC_HEADER_SIZE + 2 * FRAME_SIZE - 4;
        let expected = packed_offset(3, 4, 1);
        bytes[field..field + 4].copy_from_slice(&((expected + 16) as i32).to_le_bytes());

        assert_eq!(
            decode(&bytes, &skeleton()).unwrap_err(),
            SkelError::UnsupportedQuantization {
                frame: 1,
                offset: expected + 16,
                expected,
            }
        );

        // Version 13 follows the offset wherever it points
        bytes[4..8].copy_from_slice(&13u32.to_le_bytes());
        assert!(decode(&bytes, &skeleton()).is_ok());
    }

    #[test]
    fn test_oversized_counts_are_truncation() {
        let mut header = SkcHeader::new(AnimationVersion::V13);
        header.num_channels = i32::MAX as usize;
        header.ofs_channel_names = SKC_HEADER_SIZE;
        let mut writer = ByteWriter::new();
        header.write(&mut writer).unwrap();
        let bytes = writer.into_inner();

        assert!(matches!(
            parse_preamble(&bytes),
            Err(SkelError::Truncated { offset: 48, len: 48, .. })
        ));

        let mut frames = SkcHeader::new(AnimationVersion::V14);
        frames.num_frames = i32::MAX as usize;
        let mut writer = ByteWriter::new();
        frames.write(&mut writer).unwrap();
        assert!(matches!(
            parse_preamble(writer.as_slice()),
            Err(SkelError::Truncated { offset: 48, .. })
        ));
    }

    #[test]
    fn test_short_channel_refused() {
        let mut clip = clip();
        clip.curves[0].values.pop();
        assert!(matches!(
            encode(&clip, AnimationVersion::V13),
            Err(SkelError::ChannelLengthMismatch { expected: 3, found: 2, .. })
        ));
    }
}
