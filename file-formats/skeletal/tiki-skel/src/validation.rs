//! Validation of decoded and to-be-encoded graphs
//!
//! Structural problems are errors. The only things corrected in place are
//! skin weights outside `[0, 1]` (clamped) and weight sums off by more than
//! [`WEIGHT_TOLERANCE`] (renormalized); each correction is recorded in the
//! returned [`ValidationReport`]. Nothing is ever invented: an empty
//! skeleton or a model without surfaces passes as is.

use std::fmt;

use log::{info, warn};

use crate::animation::AnimationClip;
use crate::error::{Result, SkelError};
use crate::mesh::{MAX_WEIGHTS_PER_VERTEX, SkeletalModel, Surface, Vertex, WEIGHT_TOLERANCE};
use crate::skeleton::Skeleton;

/// A correction made by the validator
#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    /// Weights outside `[0, 1]` were clamped
    Clamped {
        surface: usize,
        vertex: usize,
        count: usize,
        before_sum: f32,
        after_sum: f32,
    },
    /// Weights were scaled to sum to 1
    Renormalized {
        surface: usize,
        vertex: usize,
        before_sum: f32,
        after_sum: f32,
    },
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Clamped {
                surface,
                vertex,
                count,
                before_sum,
                after_sum,
            } => write!(
                f,
                "surface {surface}, vertex {vertex}: clamped {count} weight(s), sum {before_sum:.4} -> {after_sum:.4}"
            ),
            Adjustment::Renormalized {
                surface,
                vertex,
                before_sum,
                after_sum,
            } => write!(
                f,
                "surface {surface}, vertex {vertex}: renormalized weights, sum {before_sum:.4} -> {after_sum:.4}"
            ),
        }
    }
}

/// Corrections applied during validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub adjustments: Vec<Adjustment>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.adjustments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adjustments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    pub fn clamped(&self) -> usize {
        self.adjustments
            .iter()
            .filter(|a| matches!(a, Adjustment::Clamped { .. }))
            .count()
    }

    pub fn renormalized(&self) -> usize {
        self.adjustments
            .iter()
            .filter(|a| matches!(a, Adjustment::Renormalized { .. }))
            .count()
    }

    fn merge(&mut self, other: ValidationReport) {
        self.adjustments.extend(other.adjustments);
    }
}

/// Validates the bone hierarchy: parents precede children, names are unique
pub fn validate_skeleton(skeleton: &Skeleton) -> Result<()> {
    for (index, bone) in skeleton.iter().enumerate() {
        if let Some(parent) = bone.parent {
            let reason = if parent == index {
                Some("bone is its own parent".to_string())
            } else if parent >= skeleton.len() {
                Some(format!(
                    "parent index {parent} out of range ({} bones)",
                    skeleton.len()
                ))
            } else if parent > index {
                Some(format!("parent index {parent} comes after the bone"))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(SkelError::InvalidHierarchy {
                    bone: bone.name.clone(),
                    reason,
                });
            }
        }

        if skeleton.bones[..index].iter().any(|b| b.name == bone.name) {
            return Err(SkelError::InvalidHierarchy {
                bone: bone.name.clone(),
                reason: "duplicate bone name".to_string(),
            });
        }
    }

    // parent < index already bounds every chain; this is the direct check
    for (index, bone) in skeleton.iter().enumerate() {
        if skeleton.depth(index) >= skeleton.len() {
            return Err(SkelError::InvalidHierarchy {
                bone: bone.name.clone(),
                reason: "ancestor chain does not reach a root".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_triangles(surface: &Surface, index: usize) -> Result<()> {
    let vertex_count = surface.vertices.len();
    for (triangle_index, triangle) in surface.triangles.iter().enumerate() {
        if let Some(&bad) = triangle
            .indices
            .iter()
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(SkelError::InvalidTriangle {
                surface: index,
                triangle: triangle_index,
                index: bad,
                vertex_count,
            });
        }
    }
    Ok(())
}

fn validate_collapse(surface: &Surface, index: usize) -> Result<()> {
    let vertex_count = surface.vertices.len();
    for (name, table) in [
        ("collapse map", &surface.collapse_map),
        ("collapse index", &surface.collapse_index),
    ] {
        if table.is_empty() {
            continue;
        }
        if table.len() != vertex_count {
            return Err(SkelError::InvalidCollapseMap {
                surface: index,
                reason: format!(
                    "{name} has {} entries for {vertex_count} vertices",
                    table.len()
                ),
            });
        }
        if let Some((at, value)) = table
            .iter()
            .enumerate()
            .find(|&(_, &v)| !usize::try_from(v).is_ok_and(|v| v < vertex_count))
        {
            return Err(SkelError::InvalidCollapseMap {
                surface: index,
                reason: format!("{name} entry {at} is {value}"),
            });
        }
    }
    Ok(())
}

fn validate_weights(
    vertex: &mut Vertex,
    surface: usize,
    index: usize,
    bone_count: usize,
) -> Result<Vec<Adjustment>> {
    let invalid = |reason: String| SkelError::InvalidWeights {
        surface,
        vertex: index,
        reason,
    };

    if vertex.weights.is_empty() {
        return Err(invalid("vertex has no weights".to_string()));
    }
    if vertex.weights.len() > MAX_WEIGHTS_PER_VERTEX {
        return Err(SkelError::TooManyInfluences {
            surface,
            vertex: index,
            count: vertex.weights.len(),
            max: MAX_WEIGHTS_PER_VERTEX,
        });
    }
    for weight in &vertex.weights {
        if weight.bone >= bone_count {
            return Err(invalid(format!(
                "references bone {} but the skeleton has {bone_count} bones",
                weight.bone
            )));
        }
        if !weight.weight.is_finite() {
            return Err(invalid(format!("weight {} is not finite", weight.weight)));
        }
    }

    let mut adjustments = Vec::new();
    let before_sum = vertex.weight_sum();
    let mut clamped = 0;
    for weight in &mut vertex.weights {
        let value = weight.weight.clamp(0.0, 1.0);
        if value != weight.weight {
            weight.weight = value;
            clamped += 1;
        }
    }
    if clamped > 0 {
        let after_sum = vertex.weight_sum();
        warn!(
            "Surface {surface}, vertex {index}: clamped {clamped} weight(s), sum {before_sum} -> {after_sum}"
        );
        adjustments.push(Adjustment::Clamped {
            surface,
            vertex: index,
            count: clamped,
            before_sum,
            after_sum,
        });
    }

    let sum = vertex.weight_sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        if sum <= f32::EPSILON {
            return Err(invalid("weights sum to zero".to_string()));
        }
        for weight in &mut vertex.weights {
            weight.weight /= sum;
        }
        let after_sum = vertex.weight_sum();
        info!("Surface {surface}, vertex {index}: renormalized weights, sum {sum} -> {after_sum}");
        adjustments.push(Adjustment::Renormalized {
            surface,
            vertex: index,
            before_sum: sum,
            after_sum,
        });
    }
    Ok(adjustments)
}

/// Validates surfaces against the skeleton, correcting weights in place
///
/// Vertices whose weights change get their bind position recomputed.
pub fn validate_surfaces(
    surfaces: &mut [Surface],
    skeleton: &Skeleton,
) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    let mut world = None;

    for (surface_index, surface) in surfaces.iter_mut().enumerate() {
        validate_triangles(surface, surface_index)?;
        validate_collapse(surface, surface_index)?;

        for (vertex_index, vertex) in surface.vertices.iter_mut().enumerate() {
            let adjustments =
                validate_weights(vertex, surface_index, vertex_index, skeleton.len())?;
            if !adjustments.is_empty() {
                let world = world.get_or_insert_with(|| skeleton.world_transforms());
                vertex.position = vertex.skinned_position(world);
                report.adjustments.extend(adjustments);
            }
        }
    }
    Ok(report)
}

/// Validates a whole model: hierarchy, surfaces, hit boxes and morphs
pub fn validate_model(model: &mut SkeletalModel) -> Result<ValidationReport> {
    validate_skeleton(&model.skeleton)?;

    let mut report = ValidationReport::default();
    report.merge(validate_surfaces(&mut model.surfaces, &model.skeleton)?);

    let bone_count = model.skeleton.len();
    for (index, hit_box) in model.info.hit_boxes.iter().enumerate() {
        if hit_box.bone >= bone_count {
            return Err(SkelError::InvalidBoneReference {
                what: format!("hit box {index}"),
                index: hit_box.bone,
                bone_count,
            });
        }
    }

    let count = model.info.morph_targets.len();
    for (surface_index, surface) in model.surfaces.iter().enumerate() {
        for (vertex_index, vertex) in surface.vertices.iter().enumerate() {
            if let Some(morph) = vertex.morphs.iter().find(|m| m.target >= count) {
                return Err(SkelError::InvalidMorphTarget {
                    surface: surface_index,
                    vertex: vertex_index,
                    target: morph.target,
                    count,
                });
            }
        }
    }

    if !report.is_clean() {
        info!(
            "Validation adjusted {} vertices ({} clamped, {} renormalized)",
            report.len(),
            report.clamped(),
            report.renormalized()
        );
    }
    Ok(report)
}

/// Validates that a clip lines up with the skeleton and every channel has one
/// value per frame
pub fn validate_clip(clip: &AnimationClip, skeleton: &Skeleton) -> Result<()> {
    let stored = clip.channels.iter().filter(|c| !c.tracks.is_empty()).count();
    if clip.channels.len() != skeleton.len() || stored != clip.channels.len() {
        return Err(SkelError::ChannelCountMismatch {
            expected: skeleton.len(),
            found: stored,
        });
    }

    for (index, (channel, bone)) in clip.channels.iter().zip(skeleton.iter()).enumerate() {
        if !channel.bone.eq_ignore_ascii_case(&bone.name) {
            return Err(SkelError::ChannelNameMismatch {
                index,
                channel: channel.bone.clone(),
                bone: bone.name.clone(),
            });
        }
    }

    let expected = clip.frames.len();
    for channel in &clip.channels {
        if channel.keys.len() != expected {
            return Err(SkelError::ChannelLengthMismatch {
                channel: channel.bone.clone(),
                expected,
                found: channel.keys.len(),
            });
        }
    }
    for curve in &clip.curves {
        if curve.values.len() != expected {
            return Err(SkelError::ChannelLengthMismatch {
                channel: curve.name.clone(),
                expected,
                found: curve.values.len(),
            });
        }
    }
    Ok(())
}
