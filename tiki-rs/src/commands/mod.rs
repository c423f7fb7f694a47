//! Command implementations for each file format

pub mod skc;
pub mod skd;

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::Path;
use tiki_skel::{ConvertOptions, SkeletalModel};

/// Coordinate options shared by the convert commands
#[derive(Args, Debug, Clone, Copy)]
pub struct ConvertArgs {
    /// Uniform scale applied to positions on import (undone on export)
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    /// Treat file data as Z-up and swap to Y-up in between
    #[arg(long)]
    pub swap_yz: bool,

    /// Flip the V texture coordinate
    #[arg(long)]
    pub flip_uv: bool,
}

impl ConvertArgs {
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions::default()
            .with_scale(self.scale)
            .with_axis_swap(self.swap_yz)
            .with_flip_uv(self.flip_uv)
    }
}

/// Read a whole file
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Write a whole file
pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Load a model in file coordinates
pub fn load_model(path: &Path) -> Result<SkeletalModel> {
    let data = read_file(path)?;
    tiki_skel::import_model(&data, &ConvertOptions::default())
        .with_context(|| format!("Failed to parse SKD file: {}", path.display()))
}
