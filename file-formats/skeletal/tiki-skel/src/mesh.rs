//! Skinned surfaces and the model container

use glam::{Vec2, Vec3};

use crate::common::Transform;
use crate::skeleton::Skeleton;

/// Most bones a single vertex may be weighted to
pub const MAX_WEIGHTS_PER_VERTEX: usize = 8;

/// Allowed deviation of a vertex weight sum from 1.0
pub const WEIGHT_TOLERANCE: f32 = 1e-3;

/// Number of LOD distance entries in the model header
pub const LOD_INDEX_COUNT: usize = 10;

/// One bone influence on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct BoneWeight {
    pub bone: usize,
    pub weight: f32,
    /// Vertex position in the bone's bind space
    pub offset: Vec3,
}

/// Per-vertex displacement for one morph target
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct MorphOffset {
    /// Index into [`ModelInfo::morph_targets`]
    pub target: usize,
    pub offset: Vec3,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Vertex {
    /// Bind-pose position in model space
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub weights: Vec<BoneWeight>,
    pub morphs: Vec<MorphOffset>,
}

impl Vertex {
    pub fn weight_sum(&self) -> f32 {
        self.weights.iter().map(|w| w.weight).sum()
    }

    /// Bind-pose position from the weights and bone world transforms
    pub fn skinned_position(&self, bone_world: &[Transform]) -> Vec3 {
        self.weights
            .iter()
            .filter_map(|w| {
                bone_world
                    .get(w.bone)
                    .map(|t| t.transform_point(w.offset) * w.weight)
            })
            .sum()
    }
}

/// Three vertex indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { indices: [a, b, c] }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Surface {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    /// LOD collapse map, empty or one entry per vertex
    pub collapse_map: Vec<i32>,
    /// LOD collapse index, empty or one entry per vertex
    pub collapse_index: Vec<i32>,
    pub ident: i32,
    pub static_processed: i32,
}

impl Surface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Recompute vertex positions from their weights
    pub fn update_positions(&mut self, bone_world: &[Transform]) {
        for vertex in &mut self.vertices {
            vertex.position = vertex.skinned_position(bone_world);
        }
    }
}

/// A hit location bound to a bone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct HitBox {
    pub bone: usize,
}

/// Model-level header data
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ModelInfo {
    pub name: String,
    pub lod_index: [i32; LOD_INDEX_COUNT],
    pub hit_boxes: Vec<HitBox>,
    pub morph_targets: Vec<String>,
    pub scale: f32,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            lod_index: [0; LOD_INDEX_COUNT],
            hit_boxes: Vec::new(),
            morph_targets: Vec::new(),
            scale: 1.0,
        }
    }
}

/// A decoded SKD model
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SkeletalModel {
    pub skeleton: Skeleton,
    pub surfaces: Vec<Surface>,
    pub info: ModelInfo,
}

impl SkeletalModel {
    pub fn new(skeleton: Skeleton, surfaces: Vec<Surface>) -> Self {
        Self {
            skeleton,
            surfaces,
            info: ModelInfo::default(),
        }
    }

    pub fn into_parts(self) -> (Skeleton, Vec<Surface>) {
        (self.skeleton, self.surfaces)
    }

    pub fn vertex_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.triangles.len()).sum()
    }

    /// Axis-aligned bounds of the bind-pose vertices, `None` without vertices
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.surfaces
            .iter()
            .flat_map(|s| s.vertices.iter())
            .map(|v| v.position)
            .fold(None, |acc, p| match acc {
                None => Some((p, p)),
                Some((min, max)) => Some((min.min(p), max.max(p))),
            })
    }

    /// Recompute every vertex position from weights and the bind skeleton
    pub fn update_positions(&mut self) {
        let world = self.skeleton.world_transforms();
        for surface in &mut self.surfaces {
            surface.update_positions(&world);
        }
    }

    /// Whether anything requires the v6 layout
    pub fn uses_morphs(&self) -> bool {
        !self.info.morph_targets.is_empty()
            || self
                .surfaces
                .iter()
                .flat_map(|s| s.vertices.iter())
                .any(|v| !v.morphs.is_empty())
    }
}
