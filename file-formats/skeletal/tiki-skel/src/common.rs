//! Types shared by models and animations

use glam::{Affine3A, Quat, Vec3};

/// A local bone transform
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-support",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    /// SKD and SKC carry no per-bone scale, decoded transforms leave this `None`
    pub scale: Option<Vec3>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: None,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            scale: None,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self::new(Vec3::ZERO, rotation)
    }

    /// The transform as an affine matrix
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(
            self.scale.unwrap_or(Vec3::ONE),
            self.rotation,
            self.translation,
        )
    }

    /// Compose `self` (parent) with `child`, yielding the child in parent space
    ///
    /// Scale is ignored; it never appears in decoded data.
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform::new(
            self.translation + self.rotation * child.translation,
            (self.rotation * child.rotation).normalize(),
        )
    }

    /// Map a point from this transform's space into its parent space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    /// Map a point from parent space into this transform's space
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_compose_and_points() {
        let parent = Transform::new(Vec3::new(0.0, 0.0, 10.0), Quat::from_rotation_z(FRAC_PI_2));
        let child = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let world = parent.mul_transform(&child);
        assert!(world.translation.abs_diff_eq(Vec3::new(0.0, 1.0, 10.0), 1e-5));

        let p = Vec3::new(2.0, 3.0, 4.0);
        let back = parent.inverse_transform_point(parent.transform_point(p));
        assert!(back.abs_diff_eq(p, 1e-5));
    }

    #[test]
    fn test_affine_matches_transform_point() {
        let t = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_x(0.3));
        let p = Vec3::new(-1.0, 0.5, 2.0);
        assert!(
            t.to_affine()
                .transform_point3(p)
                .abs_diff_eq(t.transform_point(p), 1e-5)
        );
    }
}
