//! Rebinding a model to an animation frame
//!
//! Many SKD files ship with collapsed bind offsets and only get a usable
//! skeleton from their animations. [`apply_clip_rest_pose`] takes the
//! position keys of one frame as the new bind translations and rewrites every
//! weight offset so the bind-pose mesh stays where it was.

use log::debug;

use crate::animation::AnimationClip;
use crate::error::{Result, SkelError};
use crate::mesh::SkeletalModel;
use crate::validation::validate_clip;

/// Replace bind translations with the clip's position keys at `frame`
///
/// Bones whose channel has no position track keep their translation.
/// Returns the number of bones whose bind translation was replaced.
pub fn apply_clip_rest_pose(
    model: &mut SkeletalModel,
    clip: &AnimationClip,
    frame: usize,
) -> Result<usize> {
    if frame >= clip.frames.len() {
        return Err(SkelError::InvalidField {
            field: "frame",
            value: i64::try_from(frame).unwrap_or(i64::MAX),
            offset: 0,
        });
    }
    validate_clip(clip, &model.skeleton)?;

    let old_world = model.skeleton.world_transforms();
    let mut moved = 0;
    for (bone, channel) in model.skeleton.bones.iter_mut().zip(&clip.channels) {
        if channel.has_position() {
            bone.bind.translation = channel.keys[frame].translation;
            moved += 1;
        }
    }
    let new_world = model.skeleton.world_transforms();

    for surface in &mut model.surfaces {
        for vertex in &mut surface.vertices {
            for weight in &mut vertex.weights {
                if let (Some(old), Some(new)) =
                    (old_world.get(weight.bone), new_world.get(weight.bone))
                {
                    let point = old.transform_point(weight.offset);
                    weight.offset = new.inverse_transform_point(point);
                }
            }
        }
    }

    debug!("Rest pose from frame {frame}: {moved} bones moved");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Channel, ChannelTracks, FrameInfo};
    use crate::common::Transform;
    use crate::mesh::{BoneWeight, Surface, Vertex};
    use crate::skeleton::{Bone, BoneKind, Skeleton};
    use glam::Vec3;

    fn collapsed_model() -> SkeletalModel {
        let skeleton = Skeleton::new(vec![
            Bone::new("root", None, BoneKind::PosRot, Transform::IDENTITY),
            Bone::new("head", Some(0), BoneKind::Rotation, Transform::IDENTITY),
        ]);
        let mut surface = Surface::new("s");
        surface.vertices.push(Vertex {
            weights: vec![
                BoneWeight {
                    bone: 0,
                    weight: 0.5,
                    offset: Vec3::new(0.0, 0.0, 60.0),
                },
                BoneWeight {
                    bone: 1,
                    weight: 0.5,
                    offset: Vec3::new(0.0, 0.0, 60.0),
                },
            ],
            ..Vertex::default()
        });
        let mut model = SkeletalModel::new(skeleton, vec![surface]);
        model.update_positions();
        model
    }

    fn clip() -> AnimationClip {
        AnimationClip {
            frames: vec![FrameInfo::default(); 2],
            channels: vec![
                Channel::new(
                    "root",
                    ChannelTracks::all(),
                    vec![
                        Transform::from_translation(Vec3::new(0.0, 0.0, 40.0)),
                        Transform::from_translation(Vec3::new(0.0, 0.0, 41.0)),
                    ],
                ),
                Channel::new(
                    "head",
                    ChannelTracks::all(),
                    vec![Transform::from_translation(Vec3::new(0.0, 0.0, 18.0)); 2],
                ),
            ],
            ..AnimationClip::default()
        }
    }

    #[test]
    fn test_mesh_stays_in_place() {
        let mut model = collapsed_model();
        let before = model.surfaces[0].vertices[0].position;

        let moved = apply_clip_rest_pose(&mut model, &clip(), 0).unwrap();
        assert_eq!(moved, 2);
        assert_eq!(model.skeleton.bones[1].bind.translation, Vec3::new(0.0, 0.0, 18.0));

        let weights = &model.surfaces[0].vertices[0].weights;
        assert!(weights[0].offset.abs_diff_eq(Vec3::new(0.0, 0.0, 20.0), 1e-5));
        assert!(weights[1].offset.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));

        model.update_positions();
        assert!(model.surfaces[0].vertices[0].position.abs_diff_eq(before, 1e-4));
    }

    #[test]
    fn test_rotation_only_channel_keeps_translation() {
        let mut model = collapsed_model();
        let mut clip = clip();
        clip.channels[1].tracks = ChannelTracks::ROTATION;
        assert_eq!(apply_clip_rest_pose(&mut model, &clip, 1).unwrap(), 1);
        assert_eq!(model.skeleton.bones[1].bind.translation, Vec3::ZERO);
    }

    #[test]
    fn test_frame_out_of_range() {
        let mut model = collapsed_model();
        assert!(matches!(
            apply_clip_rest_pose(&mut model, &clip(), 2),
            Err(SkelError::InvalidField { field: "frame", value: 2, .. })
        ));
    }
}
