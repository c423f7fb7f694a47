//! Coordinate and unit conversion between file space and host space
//!
//! SKD and SKC data is Z-up. Hosts that want Y-up enable `axis_swap`, which
//! maps `(x, y, z)` to `(x, -z, y)`. That is a 90° rotation about X, so
//! handedness is preserved and rotations are converted by conjugation, which
//! for this remap is simply `(x, y, z, w) → (x, -z, y, w)`.
//!
//! Positions are additionally multiplied by `scale`; `flip_uv` maps `v` to
//! `1 - v`. Every method has an inverse that undoes it up to rounding. With
//! default options nothing is touched at all, so a decode/encode cycle stays
//! bit-exact.
//!
//! # Examples
//!
//! ```rust
//! use glam::Vec3;
//! use tiki_skel::coordinate::{ConvertOptions, Converter};
//!
//! let converter = Converter::new(ConvertOptions::default().with_axis_swap(true).with_scale(0.5))?;
//! let host = converter.position(Vec3::new(2.0, 4.0, 8.0));
//! assert_eq!(host, Vec3::new(1.0, -4.0, 2.0));
//! assert_eq!(converter.inverse_position(host), Vec3::new(2.0, 4.0, 8.0));
//! # Ok::<(), tiki_skel::SkelError>(())
//! ```

use glam::{Quat, Vec2, Vec3};

use crate::animation::AnimationClip;
use crate::common::Transform;
use crate::error::{Result, SkelError};
use crate::mesh::SkeletalModel;
use crate::skeleton::Skeleton;

/// Conversion applied on import and undone on export
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ConvertOptions {
    /// Uniform unit scale for positions
    pub scale: f32,
    /// Convert Z-up file space to Y-up host space
    pub axis_swap: bool,
    /// Flip the V texture coordinate
    pub flip_uv: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            axis_swap: false,
            flip_uv: false,
        }
    }
}

impl ConvertOptions {
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_axis_swap(mut self, axis_swap: bool) -> Self {
        self.axis_swap = axis_swap;
        self
    }

    pub fn with_flip_uv(mut self, flip_uv: bool) -> Self {
        self.flip_uv = flip_uv;
        self
    }

    /// Reject a scale that is zero or not finite
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(SkelError::InvalidOptions(format!(
                "scale must be finite and non-zero, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    /// Whether the options leave everything untouched
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && !self.axis_swap && !self.flip_uv
    }
}

/// Pure conversion functions for one set of options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    fn remap(&self, v: Vec3) -> Vec3 {
        if self.options.axis_swap {
            Vec3::new(v.x, -v.z, v.y)
        } else {
            v
        }
    }

    fn inverse_remap(&self, v: Vec3) -> Vec3 {
        if self.options.axis_swap {
            Vec3::new(v.x, v.z, -v.y)
        } else {
            v
        }
    }

    pub fn position(&self, p: Vec3) -> Vec3 {
        self.remap(p) * self.options.scale
    }

    pub fn inverse_position(&self, p: Vec3) -> Vec3 {
        self.inverse_remap(p / self.options.scale)
    }

    pub fn normal(&self, n: Vec3) -> Vec3 {
        self.remap(n)
    }

    pub fn inverse_normal(&self, n: Vec3) -> Vec3 {
        self.inverse_remap(n)
    }

    pub fn rotation(&self, q: Quat) -> Quat {
        if self.options.axis_swap {
            Quat::from_xyzw(q.x, -q.z, q.y, q.w)
        } else {
            q
        }
    }

    pub fn inverse_rotation(&self, q: Quat) -> Quat {
        if self.options.axis_swap {
            Quat::from_xyzw(q.x, q.z, -q.y, q.w)
        } else {
            q
        }
    }

    pub fn uv(&self, uv: Vec2) -> Vec2 {
        if self.options.flip_uv {
            Vec2::new(uv.x, 1.0 - uv.y)
        } else {
            uv
        }
    }

    pub fn inverse_uv(&self, uv: Vec2) -> Vec2 {
        self.uv(uv)
    }

    pub fn transform(&self, t: &Transform) -> Transform {
        Transform {
            translation: self.position(t.translation),
            rotation: self.rotation(t.rotation),
            scale: t.scale,
        }
    }

    pub fn inverse_transform(&self, t: &Transform) -> Transform {
        Transform {
            translation: self.inverse_position(t.translation),
            rotation: self.inverse_rotation(t.rotation),
            scale: t.scale,
        }
    }

    fn bounds(&self, min: Vec3, max: Vec3, f: impl Fn(Vec3) -> Vec3) -> (Vec3, Vec3) {
        let (a, b) = (f(min), f(max));
        (a.min(b), a.max(b))
    }

    fn convert_model(&self, model: &mut SkeletalModel, forward: bool) {
        let position = |p: Vec3| if forward { self.position(p) } else { self.inverse_position(p) };
        let normal = |n: Vec3| if forward { self.normal(n) } else { self.inverse_normal(n) };
        if forward {
            self.skeleton_to_host(&mut model.skeleton);
        } else {
            self.skeleton_to_file(&mut model.skeleton);
        }
        for surface in &mut model.surfaces {
            for vertex in &mut surface.vertices {
                vertex.position = position(vertex.position);
                vertex.normal = normal(vertex.normal);
                vertex.uv = self.uv(vertex.uv);
                for weight in &mut vertex.weights {
                    weight.offset = position(weight.offset);
                }
                for morph in &mut vertex.morphs {
                    morph.offset = position(morph.offset);
                }
            }
        }
    }

    fn convert_clip(&self, clip: &mut AnimationClip, forward: bool) {
        let position = |p: Vec3| if forward { self.position(p) } else { self.inverse_position(p) };
        let factor = if forward {
            self.options.scale.abs()
        } else {
            1.0 / self.options.scale.abs()
        };

        clip.total_delta = position(clip.total_delta);
        for frame in &mut clip.frames {
            (frame.bounds_min, frame.bounds_max) =
                self.bounds(frame.bounds_min, frame.bounds_max, position);
            frame.radius *= factor;
            frame.delta = position(frame.delta);
        }
        for channel in &mut clip.channels {
            for key in &mut channel.keys {
                *key = if forward {
                    self.transform(key)
                } else {
                    self.inverse_transform(key)
                };
            }
        }
    }

    /// Bind transforms from file space to host space, in place
    pub fn skeleton_to_host(&self, skeleton: &mut Skeleton) {
        if !self.options.is_identity() {
            for bone in &mut skeleton.bones {
                bone.bind = self.transform(&bone.bind);
            }
        }
    }

    /// Bind transforms from host space to file space, in place
    pub fn skeleton_to_file(&self, skeleton: &mut Skeleton) {
        if !self.options.is_identity() {
            for bone in &mut skeleton.bones {
                bone.bind = self.inverse_transform(&bone.bind);
            }
        }
    }

    /// File space to host space, in place
    pub fn model_to_host(&self, model: &mut SkeletalModel) {
        if !self.options.is_identity() {
            self.convert_model(model, true);
        }
    }

    /// Host space to file space, in place
    pub fn model_to_file(&self, model: &mut SkeletalModel) {
        if !self.options.is_identity() {
            self.convert_model(model, false);
        }
    }

    /// File space to host space, in place
    pub fn clip_to_host(&self, clip: &mut AnimationClip) {
        if !self.options.is_identity() {
            self.convert_clip(clip, true);
        }
    }

    /// Host space to file space, in place
    pub fn clip_to_file(&self, clip: &mut AnimationClip) {
        if !self.options.is_identity() {
            self.convert_clip(clip, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::FrameInfo;
    use crate::mesh::{BoneWeight, Surface, Vertex};
    use crate::skeleton::{Bone, BoneKind, Skeleton};
    use std::f32::consts::FRAC_PI_2;

    fn swap() -> Converter {
        Converter::new(ConvertOptions::default().with_axis_swap(true)).unwrap()
    }

    #[test]
    fn test_invalid_scale() {
        for scale in [0.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                Converter::new(ConvertOptions::default().with_scale(scale)),
                Err(SkelError::InvalidOptions(_))
            ));
        }
    }

    #[test]
    fn test_swap_is_rotation_about_x() {
        let converter = swap();
        let about_x = Quat::from_rotation_x(FRAC_PI_2);
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!(converter.position(p).abs_diff_eq(about_x * p, 1e-6));

        // Conjugating a rotation keeps it consistent with the remapped positions
        let q = Quat::from_rotation_z(0.7);
        let lhs = converter.rotation(q) * converter.position(p);
        let rhs = converter.position(q * p);
        assert!(lhs.abs_diff_eq(rhs, 1e-5));
    }

    #[test]
    fn test_inverse() {
        let converter = Converter::new(ConvertOptions {
            scale: 2.54,
            axis_swap: true,
            flip_uv: true,
        })
        .unwrap();
        let p = Vec3::new(-3.0, 7.5, 12.25);
        assert!(converter.inverse_position(converter.position(p)).abs_diff_eq(p, 1e-5));
        let q = Quat::from_euler(glam::EulerRot::XYZ, 0.1, 0.2, 0.3);
        assert!(converter.inverse_rotation(converter.rotation(q)).abs_diff_eq(q, 1e-6));
        let uv = Vec2::new(0.25, 0.125);
        assert_eq!(converter.uv(uv), Vec2::new(0.25, 0.875));
        assert_eq!(converter.inverse_uv(converter.uv(uv)), uv);
    }

    #[test]
    fn test_identity_leaves_model_untouched() {
        let mut surface = Surface::new("s");
        surface.vertices.push(Vertex {
            position: Vec3::new(0.1, 0.2, 0.3),
            uv: Vec2::new(0.3, 0.7),
            weights: vec![BoneWeight {
                bone: 0,
                weight: 1.0,
                offset: Vec3::new(0.1, 0.2, 0.3),
            }],
            ..Vertex::default()
        });
        let mut model = SkeletalModel::new(
            Skeleton::new(vec![Bone::new("b", None, BoneKind::PosRot, Transform::IDENTITY)]),
            vec![surface],
        );
        let before = model.clone();
        Converter::new(ConvertOptions::default())
            .unwrap()
            .model_to_host(&mut model);
        assert_eq!(model, before);
    }

    #[test]
    fn test_clip_bounds_resorted() {
        let mut clip = AnimationClip {
            frames: vec![FrameInfo {
                bounds_min: Vec3::new(-1.0, -2.0, -3.0),
                bounds_max: Vec3::new(1.0, 2.0, 3.0),
                radius: 4.0,
                delta: Vec3::new(0.0, 1.0, 0.0),
                angle_delta: 0.0,
            }],
            ..AnimationClip::default()
        };
        let converter =
            Converter::new(ConvertOptions::default().with_axis_swap(true).with_scale(2.0)).unwrap();
        converter.clip_to_host(&mut clip);
        let frame = clip.frames[0];
        assert_eq!(frame.bounds_min, Vec3::new(-2.0, -6.0, -4.0));
        assert_eq!(frame.bounds_max, Vec3::new(2.0, 6.0, 4.0));
        assert_eq!(frame.radius, 8.0);
        assert_eq!(frame.delta, Vec3::new(0.0, 0.0, 2.0));

        converter.clip_to_file(&mut clip);
        assert_eq!(clip.frames[0].bounds_min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(clip.frames[0].radius, 4.0);
    }
}
