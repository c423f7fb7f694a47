//! Bone hierarchy shared by models and animations
//!
//! Bones are stored in file order and reference their parent by index. A
//! skeleton that went through [`crate::validation::validate_skeleton`] has every
//! parent strictly before its child, so a single forward pass is enough to
//! compute world transforms and every ancestor walk terminates.

use glam::Vec3;

use crate::common::Transform;

/// Name used by the exporters for the implicit parent of root bones
pub const WORLD_BONE_NAME: &str = "worldbone";

/// Hose bone parameters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HoseParams {
    pub bend_ratio: f32,
    pub bend_max: f32,
    pub spin_ratio: f32,
}

/// Bone types, with the type-specific base data that is not part of the bind transform
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum BoneKind {
    /// Rotation only, offset from the parent is fixed
    Rotation,
    /// Animated position and rotation
    #[default]
    PosRot,
    /// IK shoulder, carries a base rotation
    IkShoulder,
    IkElbow,
    IkWrist,
    /// Hose twisting with its child
    HoseRot(HoseParams),
    /// Averaged rotation
    AvRot { length: f32 },
    /// Always identity
    Zero,
    HoseRotBoth(HoseParams),
    HoseRotParent(HoseParams),
    /// Placed in world space
    World,
}

impl BoneKind {
    /// The on-disk `boneType` value
    pub fn type_value(&self) -> i32 {
        match self {
            BoneKind::Rotation => 0,
            BoneKind::PosRot => 1,
            BoneKind::IkShoulder => 2,
            BoneKind::IkElbow => 3,
            BoneKind::IkWrist => 4,
            BoneKind::HoseRot(_) => 5,
            BoneKind::AvRot { .. } => 6,
            BoneKind::Zero => 7,
            BoneKind::World => 9,
            BoneKind::HoseRotBoth(_) => 10,
            BoneKind::HoseRotParent(_) => 11,
        }
    }

    /// Human readable name of the type
    pub fn name(&self) -> &'static str {
        match self {
            BoneKind::Rotation => "rotation",
            BoneKind::PosRot => "posrot",
            BoneKind::IkShoulder => "ik_shoulder",
            BoneKind::IkElbow => "ik_elbow",
            BoneKind::IkWrist => "ik_wrist",
            BoneKind::HoseRot(_) => "hoserot",
            BoneKind::AvRot { .. } => "avrot",
            BoneKind::Zero => "zero",
            BoneKind::World => "world",
            BoneKind::HoseRotBoth(_) => "hoserot_both",
            BoneKind::HoseRotParent(_) => "hoserot_parent",
        }
    }

    /// Hose parameters, if this is a hose bone
    pub fn hose(&self) -> Option<&HoseParams> {
        match self {
            BoneKind::HoseRot(p) | BoneKind::HoseRotBoth(p) | BoneKind::HoseRotParent(p) => {
                Some(p)
            }
            _ => None,
        }
    }

    /// Whether the base data carries an offset from the parent
    pub fn has_offset(&self) -> bool {
        !matches!(self, BoneKind::Zero | BoneKind::World)
    }
}

/// A single bone
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Bone {
    pub name: String,
    /// Parent index, `None` for roots
    pub parent: Option<usize>,
    pub kind: BoneKind,
    /// Bind transform, local to the parent
    pub bind: Transform,
    /// Channel names stored with the bone record
    pub channel_names: Vec<String>,
    /// Reference bone names stored with the bone record
    pub reference_names: Vec<String>,
}

impl Bone {
    pub fn new(
        name: impl Into<String>,
        parent: Option<usize>,
        kind: BoneKind,
        bind: Transform,
    ) -> Self {
        Self {
            name: name.into(),
            parent,
            kind,
            bind,
            channel_names: Vec::new(),
            reference_names: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Ordered bone list
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Self {
        Self { bones }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bone> {
        self.bones.iter()
    }

    /// Find a bone index by name (ASCII case-insensitive, as the engine compares names)
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones
            .iter()
            .position(|b| b.name == name)
            .or_else(|| {
                self.bones
                    .iter()
                    .position(|b| b.name.eq_ignore_ascii_case(name))
            })
    }

    /// Indices of the direct children of `index`
    pub fn children(&self, index: usize) -> Vec<usize> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent == Some(index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of all root bones
    pub fn roots(&self) -> Vec<usize> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_root())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of ancestors of `index`
    ///
    /// Stops after `len()` steps, so a cyclic graph cannot hang the walk.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.bones.get(index).and_then(|b| b.parent);
        while let Some(parent) = current {
            depth += 1;
            if depth > self.bones.len() {
                break;
            }
            current = self.bones.get(parent).and_then(|b| b.parent);
        }
        depth
    }

    /// Bind-pose transforms of every bone in model space
    ///
    /// A parent that does not precede its child is treated as a root.
    pub fn world_transforms(&self) -> Vec<Transform> {
        self.world_transforms_with(|i| self.bones[i].bind)
    }

    /// Model-space transforms for an arbitrary set of local transforms
    pub fn world_transforms_with(
        &self,
        mut local: impl FnMut(usize) -> Transform,
    ) -> Vec<Transform> {
        let mut world: Vec<Transform> = Vec::with_capacity(self.bones.len());
        for (index, bone) in self.bones.iter().enumerate() {
            let local = local(index);
            let transform = match bone.parent.and_then(|p| world.get(p)) {
                Some(parent) => parent.mul_transform(&local),
                None => local,
            };
            world.push(transform);
        }
        world
    }

    /// Model-space bind positions of every bone
    pub fn world_positions(&self) -> Vec<Vec3> {
        self.world_transforms()
            .into_iter()
            .map(|t| t.translation)
            .collect()
    }
}
