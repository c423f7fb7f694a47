//! SKC animation command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use std::path::{Path, PathBuf};
use tiki_skel::skc;
use tiki_skel::{
    AnimationClip, AnimationVersion, ConvertOptions, Converter, FileFormat, Skeleton,
    apply_clip_rest_pose, detect_format, export_animation, export_model, import_animation,
};

use super::{ConvertArgs, load_model, read_file, write_file};
use crate::utils::{channel_table, format_bytes, format_vec3, track_table};

#[derive(Subcommand)]
pub enum SkcCommands {
    /// Display information about an SKC animation
    Info {
        /// Path to the SKC file
        file: PathBuf,

        /// SKD model whose skeleton the animation drives
        #[arg(short, long)]
        skeleton: Option<PathBuf>,
    },

    /// Rewrite an animation with another version or coordinate convention
    Convert {
        /// Input SKC file
        input: PathBuf,

        /// Output SKC file
        output: PathBuf,

        /// SKD model whose skeleton the animation drives
        #[arg(short, long)]
        skeleton: PathBuf,

        /// Target version (13 or 14)
        #[arg(long, value_name = "VERSION")]
        version: Option<u32>,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Rebind a model to one frame of an animation
    RestPose {
        /// SKD model to rebind
        model: PathBuf,

        /// SKC animation providing the pose
        animation: PathBuf,

        /// Output SKD file
        output: PathBuf,

        /// Frame to take the pose from
        #[arg(short, long, default_value_t = 0)]
        frame: usize,
    },
}

pub fn execute(command: SkcCommands) -> Result<()> {
    match command {
        SkcCommands::Info { file, skeleton } => execute_info(&file, skeleton.as_deref()),
        SkcCommands::Convert {
            input,
            output,
            skeleton,
            version,
            convert,
        } => execute_convert(&input, &output, &skeleton, version, convert),
        SkcCommands::RestPose {
            model,
            animation,
            output,
            frame,
        } => execute_rest_pose(&model, &animation, &output, frame),
    }
}

fn load_clip(path: &Path, skeleton: &Skeleton) -> Result<AnimationClip> {
    let data = read_file(path)?;
    import_animation(&data, skeleton, &ConvertOptions::default())
        .with_context(|| format!("Failed to parse SKC file: {}", path.display()))
}

fn execute_info(path: &Path, skeleton: Option<&Path>) -> Result<()> {
    let data = read_file(path)?;
    match detect_format(&data).with_context(|| format!("Unrecognized file: {}", path.display()))? {
        FileFormat::Animation(_) => {}
        other => anyhow::bail!("{} is an {other} file, not an SKC animation", path.display()),
    }
    let preamble = skc::parse_preamble(&data)
        .with_context(|| format!("Failed to parse SKC file: {}", path.display()))?;
    let header = &preamble.header;
    let frame_rate = if header.frame_time > 0.0 {
        1.0 / header.frame_time
    } else {
        0.0
    };

    println!("SKC Animation: {}", style(path.display()).cyan());
    println!("  Format:      {}", style(header.version).yellow());
    println!("  File size:   {}", format_bytes(data.len() as u64));
    println!("  Frames:      {}", header.num_frames);
    println!("  Frame time:  {:.4}s ({frame_rate:.1} fps)", header.frame_time);
    println!(
        "  Duration:    {:.3}s",
        header.frame_time * header.num_frames as f32
    );
    println!("  Flags:       {:?}", header.flags);
    println!("  Total delta: {}", format_vec3(header.total_delta));
    println!("  Channels:    {}", header.num_channels);

    println!();
    channel_table(&preamble.channel_names).printstd();

    if let Some(skeleton_path) = skeleton {
        let model = load_model(skeleton_path)?;
        let clip = load_clip(path, &model.skeleton)?;
        println!();
        track_table(&clip).printstd();
    }
    Ok(())
}

fn execute_convert(
    input: &Path,
    output: &Path,
    skeleton: &Path,
    version: Option<u32>,
    convert: ConvertArgs,
) -> Result<()> {
    let target = version
        .map(|v| AnimationVersion::from_version_number(v).context("Invalid SKC version"))
        .transpose()?
        .unwrap_or_default();
    let converter = Converter::new(convert.options()).context("Invalid conversion options")?;

    let model = load_model(skeleton)?;
    let mut clip = load_clip(input, &model.skeleton)?;
    converter.clip_to_host(&mut clip);
    let bytes = export_animation(&clip, Some(target), &ConvertOptions::default())
        .with_context(|| format!("Failed to encode {target}"))?;
    write_file(output, &bytes)?;

    println!(
        "✓ Converted {} → {} ({}, {} frames, {})",
        style(input.display()).cyan(),
        style(output.display()).cyan(),
        style(target).yellow(),
        clip.frame_count(),
        format_bytes(bytes.len() as u64)
    );
    Ok(())
}

fn execute_rest_pose(
    model_path: &Path,
    animation: &Path,
    output: &Path,
    frame: usize,
) -> Result<()> {
    let data = read_file(model_path)?;
    let version = match detect_format(&data)? {
        FileFormat::Model(version) => version,
        other => anyhow::bail!("{} is an {other} file, not an SKD model", model_path.display()),
    };
    let mut model = load_model(model_path)?;
    let clip = load_clip(animation, &model.skeleton)?;

    let moved = apply_clip_rest_pose(&mut model, &clip, frame)
        .with_context(|| format!("Failed to apply frame {frame}"))?;
    let bytes = export_model(&model, Some(version), &ConvertOptions::default())
        .with_context(|| format!("Failed to encode {version}"))?;
    write_file(output, &bytes)?;

    println!(
        "✓ Rebound {} bone(s) of {} to frame {} of {} → {}",
        style(moved).yellow(),
        style(model_path.display()).cyan(),
        frame,
        style(animation.display()).cyan(),
        style(output.display()).cyan()
    );
    Ok(())
}
