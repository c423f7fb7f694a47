//! SKD model command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use std::path::{Path, PathBuf};
use tiki_skel::cursor::ByteReader;
use tiki_skel::skd::SkdHeader;
use tiki_skel::{
    ConvertOptions, Converter, FileFormat, ModelVersion, Skeleton, detect_format, export_model,
    import_model_with_report,
};

use super::{ConvertArgs, load_model, read_file, write_file};
use crate::utils::{
    NodeType, TreeNode, TreeOptions, format_bytes, format_vec3, render_tree, surface_table,
};

#[derive(Subcommand)]
pub enum SkdCommands {
    /// Display information about an SKD model
    Info {
        /// Path to the SKD file
        file: PathBuf,

        /// Show the bone tree and per-surface details
        #[arg(short, long)]
        detailed: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Import with validation and print what was corrected
    Validate {
        /// Path to the SKD file
        file: PathBuf,
    },

    /// Rewrite a model with another version or coordinate convention
    Convert {
        /// Input SKD file
        input: PathBuf,

        /// Output SKD file
        output: PathBuf,

        /// Target version (5 or 6, defaults to 6)
        #[arg(long, value_name = "VERSION")]
        version: Option<u32>,

        #[command(flatten)]
        convert: ConvertArgs,
    },

    /// Import and re-export a model and compare the bytes
    Roundtrip {
        /// Path to the SKD file
        file: PathBuf,
    },
}

pub fn execute(command: SkdCommands) -> Result<()> {
    match command {
        SkdCommands::Info {
            file,
            detailed,
            no_color,
        } => execute_info(&file, detailed, no_color),
        SkdCommands::Validate { file } => execute_validate(&file),
        SkdCommands::Convert {
            input,
            output,
            version,
            convert,
        } => execute_convert(&input, &output, version, convert),
        SkdCommands::Roundtrip { file } => execute_roundtrip(&file),
    }
}

/// Parse a `--version` argument
pub fn parse_version(version: Option<u32>) -> Result<Option<ModelVersion>> {
    version
        .map(|v| ModelVersion::from_version_number(v).context("Invalid SKD version"))
        .transpose()
}

fn model_version(data: &[u8], path: &Path) -> Result<ModelVersion> {
    match detect_format(data).with_context(|| format!("Unrecognized file: {}", path.display()))? {
        FileFormat::Model(version) => Ok(version),
        other => anyhow::bail!("{} is an {other} file, not an SKD model", path.display()),
    }
}

fn bone_node(skeleton: &Skeleton, index: usize) -> TreeNode {
    let bone = &skeleton.bones[index];
    let mut node = TreeNode::new(bone.name.clone(), NodeType::Bone)
        .with_metadata("type", bone.kind.name())
        .with_metadata("offset", format_vec3(bone.bind.translation));
    for child in skeleton.children(index) {
        node = node.add_child(bone_node(skeleton, child));
    }
    node
}

fn execute_info(path: &Path, detailed: bool, no_color: bool) -> Result<()> {
    let data = read_file(path)?;
    model_version(&data, path)?;
    let header = SkdHeader::parse(&mut ByteReader::new(&data))
        .with_context(|| format!("Failed to parse SKD header: {}", path.display()))?;
    let model = load_model(path)?;

    println!("SKD Model: {}", style(path.display()).cyan());
    println!("  Format:        {}", style(header.version).yellow());
    println!("  Name:          {}", header.name);
    println!("  File size:     {}", format_bytes(data.len() as u64));
    println!("  Bones:         {}", model.skeleton.len());
    println!("  Surfaces:      {}", model.surfaces.len());
    println!("  Vertices:      {}", model.vertex_count());
    println!("  Triangles:     {}", model.triangle_count());
    println!("  Hit boxes:     {}", model.info.hit_boxes.len());
    if header.version.has_morph_targets() {
        println!("  Morph targets: {}", model.info.morph_targets.len());
        println!("  Scale:         {}", model.info.scale);
    }
    if let Some((min, max)) = model.bounds() {
        println!("  Bounds:        {} .. {}", format_vec3(min), format_vec3(max));
    }

    if detailed {
        println!();
        let mut root = TreeNode::new("Skeleton", NodeType::Section);
        for index in model.skeleton.roots() {
            root = root.add_child(bone_node(&model.skeleton, index));
        }
        let options = TreeOptions {
            no_color,
            show_metadata: true,
            ..TreeOptions::default()
        };
        print!("{}", render_tree(&root, &options));

        println!();
        surface_table(&model).printstd();

        if !model.info.morph_targets.is_empty() {
            println!("\nMorph targets:");
            for (index, name) in model.info.morph_targets.iter().enumerate() {
                println!("  {index:3}: {name}");
            }
        }
    }
    Ok(())
}

fn execute_validate(path: &Path) -> Result<()> {
    let data = read_file(path)?;
    let version = model_version(&data, path)?;
    let (_, report) = import_model_with_report(&data, &ConvertOptions::default())
        .with_context(|| format!("Validation failed: {}", path.display()))?;

    if report.is_clean() {
        println!(
            "✓ SKD file '{}' is valid (version: {})",
            style(path.display()).cyan(),
            style(version).yellow()
        );
    } else {
        println!(
            "⚠ SKD file '{}' is usable after {} correction(s):",
            style(path.display()).cyan(),
            style(report.len()).yellow()
        );
        for adjustment in &report.adjustments {
            println!("  - {adjustment}");
        }
    }
    Ok(())
}

fn execute_convert(
    input: &Path,
    output: &Path,
    version: Option<u32>,
    convert: ConvertArgs,
) -> Result<()> {
    let target = parse_version(version)?.unwrap_or_default();
    let converter = Converter::new(convert.options()).context("Invalid conversion options")?;

    let mut model = load_model(input)?;
    converter.model_to_host(&mut model);
    let bytes = export_model(&model, Some(target), &ConvertOptions::default())
        .with_context(|| format!("Failed to encode {target}"))?;
    write_file(output, &bytes)?;

    println!(
        "✓ Converted {} → {} ({}, {})",
        style(input.display()).cyan(),
        style(output.display()).cyan(),
        style(target).yellow(),
        format_bytes(bytes.len() as u64)
    );
    Ok(())
}

fn execute_roundtrip(path: &Path) -> Result<()> {
    let data = read_file(path)?;
    let version = model_version(&data, path)?;
    let model = load_model(path)?;
    let bytes = export_model(&model, Some(version), &ConvertOptions::default())
        .with_context(|| format!("Failed to re-encode {version}"))?;

    if bytes == data {
        println!(
            "✓ {} re-encodes byte for byte ({})",
            style(path.display()).cyan(),
            format_bytes(data.len() as u64)
        );
        return Ok(());
    }

    let first_difference = data
        .iter()
        .zip(&bytes)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| data.len().min(bytes.len()));
    anyhow::bail!(
        "Round trip differs: original {} bytes, re-encoded {} bytes, first difference at offset {}",
        data.len(),
        bytes.len(),
        first_difference
    )
}
