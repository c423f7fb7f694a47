//! Channel naming and grouping
//!
//! SKC stores one channel per animated quantity, named after what it drives:
//! `"<bone> rot"` for a rotation, `"<bone> pos"` for a position, and facial
//! value channels such as `brow_left` or `viseme_aa`. Bone channels are
//! grouped back into one entry per bone.

use crate::animation::ChannelTracks;

const ROTATION_SUFFIX: &str = " rot";
const POSITION_SUFFIX: &str = " pos";
const VALUE_PREFIXES: [&str; 7] = ["brow_", "eye", "mouth_", "jaw_", "lips_", "viseme", "visme"];

/// What a channel drives, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Bone rotation, quaternion `xyzw`
    Rotation,
    /// Bone position, `xyz` and padding
    Position,
    /// Facial value channel
    Value,
    /// Anything else, kept verbatim
    Unknown,
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = name.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

/// Classify a channel name
pub fn classify(name: &str) -> ChannelKind {
    if strip_suffix_ignore_case(name, ROTATION_SUFFIX).is_some() {
        ChannelKind::Rotation
    } else if strip_suffix_ignore_case(name, POSITION_SUFFIX).is_some() {
        ChannelKind::Position
    } else {
        let lower = name.to_ascii_lowercase();
        if VALUE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            ChannelKind::Value
        } else {
            ChannelKind::Unknown
        }
    }
}

/// Bone name of a rotation or position channel
pub fn bone_name(name: &str) -> Option<&str> {
    strip_suffix_ignore_case(name, ROTATION_SUFFIX)
        .or_else(|| strip_suffix_ignore_case(name, POSITION_SUFFIX))
}

/// Channel name for a bone track
pub fn channel_name(bone: &str, track: ChannelTracks) -> String {
    if track == ChannelTracks::POSITION {
        format!("{bone}{POSITION_SUFFIX}")
    } else {
        format!("{bone}{ROTATION_SUFFIX}")
    }
}

/// File channels belonging to one bone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneChannels {
    pub bone: String,
    pub rotation: Option<usize>,
    pub position: Option<usize>,
}

impl BoneChannels {
    pub fn tracks(&self) -> ChannelTracks {
        let mut tracks = ChannelTracks::empty();
        tracks.set(ChannelTracks::ROTATION, self.rotation.is_some());
        tracks.set(ChannelTracks::POSITION, self.position.is_some());
        tracks
    }
}

/// File channels grouped by bone, plus the remaining value channels
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelLayout {
    /// Bones in order of first appearance
    pub bones: Vec<BoneChannels>,
    /// `(name, file channel index)` of value and unknown channels
    pub curves: Vec<(String, usize)>,
}

impl ChannelLayout {
    pub fn from_names(names: &[String]) -> Self {
        let mut layout = Self::default();
        for (index, name) in names.iter().enumerate() {
            let kind = classify(name);
            let bone = match (kind, bone_name(name)) {
                (ChannelKind::Rotation | ChannelKind::Position, Some(bone)) => bone,
                _ => {
                    layout.curves.push((name.clone(), index));
                    continue;
                }
            };

            let entry = match layout
                .bones
                .iter()
                .position(|b| b.bone.eq_ignore_ascii_case(bone))
            {
                Some(existing) => &mut layout.bones[existing],
                None => {
                    layout.bones.push(BoneChannels {
                        bone: bone.to_string(),
                        rotation: None,
                        position: None,
                    });
                    let last = layout.bones.len() - 1;
                    &mut layout.bones[last]
                }
            };

            let slot = if kind == ChannelKind::Rotation {
                &mut entry.rotation
            } else {
                &mut entry.position
            };
            // A repeated track keeps its first channel; the rest become curves
            if slot.is_none() {
                *slot = Some(index);
            } else {
                layout.curves.push((name.clone(), index));
            }
        }
        layout
    }
}
