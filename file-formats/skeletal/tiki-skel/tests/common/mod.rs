//! Common test fixtures

#![allow(dead_code)]

use glam::{Vec2, Vec3, Vec4};
use tiki_skel::{
    Bone, BoneKind, BoneWeight, ModelVersion, SkeletalModel, Skeleton, Surface, Transform,
    Triangle, Vertex,
};

/// Route `log` output through the test harness, `RUST_LOG=debug` to see it
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A bone name that fills its 32-byte field, leaving no terminator
pub const FULL_WIDTH_BONE: &str = "Bip01 L Forearm Twist Helper 012";

/// Root at the origin, child 10 units up
pub fn two_bone_skeleton() -> Skeleton {
    Skeleton::new(vec![
        Bone::new("root", None, BoneKind::PosRot, Transform::IDENTITY),
        Bone::new(
            "child",
            Some(0),
            BoneKind::Rotation,
            Transform::from_translation(Vec3::new(0.0, 0.0, 10.0)),
        ),
    ])
}

/// Three vertices fully weighted to the root, one triangle
pub fn two_bone_model() -> SkeletalModel {
    let mut surface = Surface::new("body");
    let corners = [
        (Vec3::new(0.0, 0.0, 0.0), Vec2::new(0.0, 0.0)),
        (Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0)),
        (Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 1.0)),
    ];
    for (offset, uv) in corners {
        surface.vertices.push(Vertex {
            position: offset,
            normal: Vec3::Z,
            uv,
            weights: vec![BoneWeight {
                bone: 0,
                weight: 1.0,
                offset,
            }],
            morphs: Vec::new(),
        });
    }
    surface.triangles.push(Triangle::new(0, 1, 2));

    let mut model = SkeletalModel::new(two_bone_skeleton(), vec![surface]);
    model.info.name = "fixture".to_string();
    model
}

/// Canonical encoding of [`two_bone_model`]
pub fn two_bone_skd(version: ModelVersion) -> Vec<u8> {
    tiki_skel::skd::encode(&two_bone_model(), version).expect("fixture encodes")
}

/// Little-endian byte builder, kept apart from the crate's own writer
#[derive(Debug, Default)]
pub struct Raw(pub Vec<u8>);

impl Raw {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn size(&mut self, value: usize) -> &mut Self {
        self.i32(i32::try_from(value).expect("fixture offsets fit in i32"))
    }

    pub fn f32s(&mut self, values: &[f32]) -> &mut Self {
        for value in values {
            self.0.extend_from_slice(&value.to_le_bytes());
        }
        self
    }

    /// Truncate or zero-pad `name` to `width` bytes
    pub fn name(&mut self, name: &str, width: usize) -> &mut Self {
        let mut field = name.as_bytes()[..name.len().min(width)].to_vec();
        field.resize(width, 0);
        self.0.extend_from_slice(&field);
        self
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(bytes);
        self
    }
}

/// Bones of [`exporter_skd`]: name, parent name, bind offset
pub const EXPORTER_BONES: [(&str, &str, [f32; 3]); 3] = [
    ("Bip01", "worldbone", [0.0, 0.0, 0.0]),
    (FULL_WIDTH_BONE, "Bip01", [0.0, 0.0, 10.0]),
    ("Bip01 Tip", FULL_WIDTH_BONE, [0.0, 4.0, 0.0]),
];

/// A hand-assembled SKD in the usual exporter layout
///
/// Header, one surface (triangles, vertices, identity collapse map and
/// collapse index), then every bone as a position-rotation record with its
/// offset as base data.
pub fn exporter_skd(version: ModelVersion) -> Vec<u8> {
    // normal, uv, weights as (bone, weight, offset)
    let vertices: [([f32; 3], [f32; 2], &[(i32, f32, [f32; 3])]); 3] = [
        ([0.0, 0.0, 1.0], [0.0, 0.0], &[(0, 1.0, [0.0, 0.0, 0.0])]),
        ([0.0, 0.0, 1.0], [1.0, 0.0], &[(1, 1.0, [1.0, 0.0, 0.0])]),
        (
            [0.0, 1.0, 0.0],
            [0.5, 1.0],
            &[(1, 0.25, [0.0, 1.0, 0.0]), (2, 0.75, [0.0, 0.0, 2.0])],
        ),
    ];
    let triangles = [[0, 1, 2]];
    let nv = vertices.len();

    let mut tris = Raw::default();
    for triangle in triangles {
        for index in triangle {
            tris.i32(index);
        }
    }
    let mut verts = Raw::default();
    for (normal, uv, weights) in vertices {
        verts.f32s(&normal).f32s(&uv).size(weights.len()).i32(0);
        for (bone, weight, offset) in weights {
            verts.i32(*bone).f32s(&[*weight]).f32s(offset);
        }
    }

    let ofs_triangles = 100;
    let ofs_verts = ofs_triangles + tris.len();
    let ofs_collapse = ofs_verts + verts.len();
    let ofs_collapse_index = ofs_collapse + nv * 4;
    let surface_end = ofs_collapse_index + nv * 4;

    let mut surface = Raw::default();
    surface
        .i32(0)
        .name("body", 64)
        .size(triangles.len())
        .size(nv)
        .i32(0)
        .size(ofs_triangles)
        .size(ofs_verts)
        .size(ofs_collapse)
        .size(surface_end)
        .size(ofs_collapse_index)
        .bytes(&tris.0)
        .bytes(&verts.0);
    for _ in 0..2 {
        for index in 0..nv {
            surface.size(index);
        }
    }

    let header_size = if version == ModelVersion::V6 { 152 } else { 140 };
    let ofs_bones = header_size + surface.len();
    let ofs_end = ofs_bones + EXPORTER_BONES.len() * 96;

    let mut out = Raw::default();
    out.bytes(b"SKMD")
        .size(version.version_number() as usize)
        .name("exporter_fixture", 64)
        .i32(1)
        .size(EXPORTER_BONES.len())
        .size(ofs_bones)
        .size(header_size)
        .size(ofs_end);
    for _ in 0..10 {
        out.i32(0);
    }
    out.i32(0).i32(0);
    if version == ModelVersion::V6 {
        out.i32(0).i32(0).f32s(&[1.0]);
    }
    out.bytes(&surface.0);
    for (name, parent, offset) in EXPORTER_BONES {
        out.name(name, 32)
            .name(parent, 32)
            .i32(1)
            .i32(84)
            .i32(0)
            .i32(0)
            .i32(96)
            .f32s(&offset);
    }
    out.0
}

/// Per-frame bounds and motion written into every SKC fixture
pub fn frame_record(frame: usize) -> [f32; 11] {
    [
        -5.0,
        -5.0,
        -5.0,
        5.0,
        5.0,
        5.0,
        8.5,
        1.0,
        0.0,
        0.0,
        frame as f32 * 0.5,
    ]
}

/// Samples of [`packed_skc`] for [`two_bone_skeleton`], one row per channel
///
/// The root turns about z and walks along x; the child holds still.
pub fn packed_channels(frames: usize) -> Vec<(&'static str, Vec<Vec4>)> {
    vec![
        (
            "root rot",
            (0..frames)
                .map(|f| Vec4::new(0.0, 0.0, f as f32 * 0.1, 1.0).normalize())
                .collect(),
        ),
        (
            "root pos",
            (0..frames)
                .map(|f| Vec4::new(f as f32 + 1.0, 0.0, 10.0, 0.0))
                .collect(),
        ),
        ("child rot", vec![Vec4::new(0.0, 0.0, 0.0, 1.0); frames]),
    ]
}

/// A hand-assembled SKC with every frame's samples packed after the frame
/// table
///
/// `frames` go into `numFrames` and the frame table; each channel row
/// supplies the samples actually stored, which may be fewer.
pub fn packed_skc(version: u32, frames: usize, channels: &[(&str, Vec<Vec4>)]) -> Vec<u8> {
    let num_channels = channels.len();
    let stored = channels.iter().map(|(_, row)| row.len()).min().unwrap_or(0);
    let samples_start = 48 + frames * 48;
    let ofs_names = samples_start + stored * num_channels * 16;
    let total = ofs_names + num_channels * 32;

    let mut out = Raw::default();
    out.bytes(b"SKAN")
        .size(version as usize)
        .i32(0)
        .size(total)
        .f32s(&[0.05])
        .f32s(&[frames as f32, 0.0, 0.0])
        .f32s(&[0.0])
        .size(num_channels)
        .size(ofs_names)
        .size(frames);
    for frame in 0..frames {
        out.f32s(&frame_record(frame))
            .size(samples_start + frame * num_channels * 16);
    }
    for frame in 0..stored {
        for (_, row) in channels {
            out.f32s(&row[frame].to_array());
        }
    }
    for (name, _) in channels {
        out.name(name, 32);
    }
    out.0
}

/// A v13 file with two bone channels whose names sit before the sample data
/// and whose samples are cut short
pub fn truncated_two_channel_skc() -> Vec<u8> {
    let names = ["root rot", "child rot"];
    let ofs_names = 48 + 48;
    let ofs_samples = ofs_names + names.len() * 32;

    let mut out = Raw::default();
    out.bytes(b"SKAN")
        .i32(13)
        .i32(0)
        .size(ofs_samples + 32)
        .f32s(&[0.05, 1.0, 0.0, 0.0, 0.0])
        .size(names.len())
        .size(ofs_names)
        .i32(1)
        .f32s(&frame_record(0))
        .size(ofs_samples);
    for name in names {
        out.name(name, 32);
    }
    out.bytes(&[0; 8]);
    out.0
}

/// Position of `needle` in `haystack`
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
