//! Animation clip types

use glam::{Vec3, Vec4};

use crate::common::Transform;

/// Frame rate assumed when a clip has no usable frame time
pub const DEFAULT_FRAME_RATE: f32 = 20.0;

bitflags::bitflags! {
    /// Animation flags stored in the SKC header
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(
        feature = "serde-support",
        derive(serde::Serialize, serde::Deserialize)
    )]
    pub struct AnimFlags: u32 {
        /// Pick a random animation from the alias list
        const RANDOM = 0x1;
        /// Do not loop
        const NOREPEAT = 0x2;
        const DONTREPEAT = Self::RANDOM.bits() | Self::NOREPEAT.bits();
        const DEFAULT_ANGLES = 0x8;
        const NOTIMECHECK = 0x10;
        /// Movement comes from the frame deltas
        const DELTADRIVEN = 0x20;
        const HASDELTA = 0x40;
        const HASMORPH = 0x80;
        const HASUPPER = 0x100;
        const AUTOSTEPS = 0x400;
        const AUTOSTEPS_RUNNING = 0x800;
        const AUTOSTEPS_EQUIPMENT = 0x1000;
    }
}

bitflags::bitflags! {
    /// Which tracks a bone channel carries on disk
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(
        feature = "serde-support",
        derive(serde::Serialize, serde::Deserialize)
    )]
    pub struct ChannelTracks: u8 {
        const ROTATION = 0x1;
        const POSITION = 0x2;
    }
}

/// Per-frame header data
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct FrameInfo {
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub radius: f32,
    pub delta: Vec3,
    pub angle_delta: f32,
}

/// Local transforms of one bone, one key per frame
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Channel {
    pub bone: String,
    pub tracks: ChannelTracks,
    pub keys: Vec<Transform>,
}

impl Channel {
    pub fn new(bone: impl Into<String>, tracks: ChannelTracks, keys: Vec<Transform>) -> Self {
        Self {
            bone: bone.into(),
            tracks,
            keys,
        }
    }

    pub fn has_rotation(&self) -> bool {
        self.tracks.contains(ChannelTracks::ROTATION)
    }

    pub fn has_position(&self) -> bool {
        self.tracks.contains(ChannelTracks::POSITION)
    }
}

/// A non-bone channel (facial values and unrecognised names), kept verbatim
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ValueCurve {
    pub name: String,
    pub values: Vec<Vec4>,
}

/// A decoded SKC animation
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AnimationClip {
    pub name: String,
    pub flags: AnimFlags,
    /// Seconds per frame
    pub frame_time: f32,
    pub total_delta: Vec3,
    pub total_angle_delta: f32,
    pub frames: Vec<FrameInfo>,
    /// One channel per skeleton bone, in skeleton order
    pub channels: Vec<Channel>,
    pub curves: Vec<ValueCurve>,
}

impl AnimationClip {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_rate(&self) -> f32 {
        if self.frame_time > 0.0 {
            1.0 / self.frame_time
        } else {
            DEFAULT_FRAME_RATE
        }
    }

    /// Length in seconds
    pub fn duration(&self) -> f32 {
        self.frames.len() as f32 / self.frame_rate()
    }

    /// Channel animating `bone`
    pub fn channel(&self, bone: &str) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|c| c.bone.eq_ignore_ascii_case(bone))
    }

    /// Local transform of every bone at `frame`, `None` past the end
    pub fn pose(&self, frame: usize) -> Option<Vec<Transform>> {
        if frame >= self.frames.len() {
            return None;
        }
        self.channels
            .iter()
            .map(|c| c.keys.get(frame).copied())
            .collect()
    }
}
