//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tiki_skel::glam::{Quat, Vec3};
use tiki_skel::{
    AnimationClip, Bone, BoneKind, BoneWeight, Channel, ChannelTracks, ConvertOptions, FrameInfo,
    ModelVersion, SkeletalModel, Skeleton, Surface, Transform, Triangle, Vertex, export_animation,
    export_model, import_model,
};

fn skeleton() -> Skeleton {
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

fn model() -> SkeletalModel {
    let mut surface = Surface::new("body");
    for offset in [Vec3::ZERO, Vec3::X, Vec3::Y] {
        surface.vertices.push(Vertex {
            position: offset,
            normal: Vec3::Z,
            weights: vec![BoneWeight {
                bone: 0,
                weight: 1.0,
                offset,
            }],
            ..Vertex::default()
        });
    }
    surface.triangles.push(Triangle::new(0, 1, 2));
    SkeletalModel::new(skeleton(), vec![surface])
}

fn clip() -> AnimationClip {
    let frames = 3;
    AnimationClip {
        frame_time: 0.05,
        frames: vec![FrameInfo::default(); frames],
        channels: vec![
            Channel::new(
                "root",
                ChannelTracks::all(),
                (0..frames)
                    .map(|f| Transform::from_translation(Vec3::new(f as f32, 0.0, 40.0)))
                    .collect(),
            ),
            Channel::new(
                "child",
                ChannelTracks::ROTATION,
                (0..frames)
                    .map(|f| {
                        Transform::new(
                            Vec3::new(0.0, 0.0, 10.0),
                            Quat::from_rotation_z(f as f32 * 0.1),
                        )
                    })
                    .collect(),
            ),
        ],
        ..AnimationClip::default()
    }
}

struct Fixture {
    dir: TempDir,
    skd: PathBuf,
    skc: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let skd = dir.path().join("model.skd");
        let skc = dir.path().join("anim.skc");
        let options = ConvertOptions::default();
        std::fs::write(&skd, export_model(&model(), None, &options).unwrap()).unwrap();
        std::fs::write(&skc, export_animation(&clip(), None, &options).unwrap()).unwrap();
        Self { dir, skd, skc }
    }

    fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn tiki() -> Command {
    Command::cargo_bin("tiki-rs").expect("binary exists")
}

fn read_model(path: &Path) -> SkeletalModel {
    import_model(&std::fs::read(path).unwrap(), &ConvertOptions::default()).unwrap()
}

#[test]
fn test_skd_info() {
    let fixture = Fixture::new();
    tiki()
        .args(["skd", "info", "--detailed", "--no-color"])
        .arg(&fixture.skd)
        .assert()
        .success()
        .stdout(predicate::str::contains("SKD v6"))
        .stdout(predicate::str::contains("Bones:         2"))
        .stdout(predicate::str::contains("child"));
}

#[test]
fn test_skd_validate_and_roundtrip() {
    let fixture = Fixture::new();
    tiki()
        .args(["skd", "validate"])
        .arg(&fixture.skd)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
    tiki()
        .args(["skd", "roundtrip"])
        .arg(&fixture.skd)
        .assert()
        .success()
        .stdout(predicate::str::contains("byte for byte"));
}

#[test]
fn test_skd_convert() {
    let fixture = Fixture::new();
    let out = fixture.out("scaled.skd");
    tiki()
        .args(["skd", "convert"])
        .arg(&fixture.skd)
        .arg(&out)
        .args(["--version", "5", "--scale", "2"])
        .assert()
        .success();

    let data = std::fs::read(&out).unwrap();
    assert_eq!(&data[..8], b"SKMD\x05\0\0\0");
    let converted = read_model(&out);
    assert_eq!(
        converted.skeleton.bones[1].bind.translation,
        Vec3::new(0.0, 0.0, 20.0)
    );
}

#[test]
fn test_skd_convert_rejects_bad_version() {
    let fixture = Fixture::new();
    tiki()
        .args(["skd", "convert"])
        .arg(&fixture.skd)
        .arg(fixture.out("bad.skd"))
        .args(["--version", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid SKD version"));
}

#[test]
fn test_skc_info_and_convert() {
    let fixture = Fixture::new();
    tiki()
        .args(["skc", "info"])
        .arg(&fixture.skc)
        .arg("--skeleton")
        .arg(&fixture.skd)
        .assert()
        .success()
        .stdout(predicate::str::contains("SKC v13"))
        .stdout(predicate::str::contains("root pos"));

    let out = fixture.out("copy.skc");
    tiki()
        .args(["skc", "convert"])
        .arg(&fixture.skc)
        .arg(&out)
        .arg("--skeleton")
        .arg(&fixture.skd)
        .assert()
        .success();
    assert_eq!(std::fs::read(&out).unwrap(), std::fs::read(&fixture.skc).unwrap());

    tiki()
        .args(["skc", "convert"])
        .arg(&fixture.skc)
        .arg(fixture.out("packed.skc"))
        .arg("--skeleton")
        .arg(&fixture.skd)
        .args(["--version", "14"])
        .assert()
        .success();
    let packed = std::fs::read(fixture.out("packed.skc")).unwrap();
    let original = std::fs::read(&fixture.skc).unwrap();
    assert_eq!(&packed[4..8], &14i32.to_le_bytes());
    assert_eq!(&packed[8..], &original[8..]);
}

#[test]
fn test_skc_rest_pose() {
    let fixture = Fixture::new();
    let out = fixture.out("rebound.skd");
    tiki()
        .args(["skc", "rest-pose"])
        .arg(&fixture.skd)
        .arg(&fixture.skc)
        .arg(&out)
        .args(["--frame", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rebound"));

    let rebound = read_model(&out);
    assert_eq!(
        rebound.skeleton.bones[0].bind.translation,
        Vec3::new(2.0, 0.0, 40.0)
    );
    let original = read_model(&fixture.skd);
    for (a, b) in rebound.surfaces[0].vertices.iter().zip(&original.surfaces[0].vertices) {
        assert!(a.position.abs_diff_eq(b.position, 1e-4));
    }
}

#[test]
fn test_verbose_flag_enables_debug_logging() {
    let fixture = Fixture::new();
    tiki()
        .env_remove("RUST_LOG")
        .args(["skd", "info", "-vv"])
        .arg(&fixture.skd)
        .assert()
        .success()
        .stderr(predicate::str::contains("Parsed 1 surfaces"));
    tiki()
        .env_remove("RUST_LOG")
        .args(["skd", "info"])
        .arg(&fixture.skd)
        .assert()
        .success()
        .stderr(predicate::str::contains("Parsed 1 surfaces").not());
}

#[test]
fn test_missing_file() {
    tiki()
        .args(["skd", "info", "does-not-exist.skd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}
