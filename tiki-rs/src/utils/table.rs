//! Tables for surfaces, channels and decoded tracks

use prettytable::{Cell, Row, Table};
use tiki_skel::skc::{ChannelKind, channel};
use tiki_skel::{AnimationClip, SkeletalModel};

use super::{format_quat, format_vec3};

fn titled(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        headers.iter().map(|h| Cell::new(h).style_spec("b")).collect(),
    ));
    table
}

fn push_row(table: &mut Table, cells: impl IntoIterator<Item = String>) {
    table.add_row(Row::new(cells.into_iter().map(|s| Cell::new(&s)).collect()));
}

fn kind_name(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Rotation => "rotation",
        ChannelKind::Position => "position",
        ChannelKind::Value => "value",
        ChannelKind::Unknown => "unknown",
    }
}

/// One row per surface: sizes, LOD tables and the widest weight list
pub fn surface_table(model: &SkeletalModel) -> Table {
    let mut table = titled(&["#", "Surface", "Vertices", "Triangles", "LOD", "Max weights"]);
    for (index, surface) in model.surfaces.iter().enumerate() {
        let max_weights = surface
            .vertices
            .iter()
            .map(|v| v.weights.len())
            .max()
            .unwrap_or(0);
        let lod = if surface.collapse_map.is_empty() { "no" } else { "yes" };
        push_row(
            &mut table,
            [
                index.to_string(),
                surface.name.clone(),
                surface.vertices.len().to_string(),
                surface.triangles.len().to_string(),
                lod.to_string(),
                max_weights.to_string(),
            ],
        );
    }
    table
}

/// One row per file channel with the kind its name implies
pub fn channel_table(names: &[String]) -> Table {
    let mut table = titled(&["#", "Channel", "Kind"]);
    for (index, name) in names.iter().enumerate() {
        push_row(
            &mut table,
            [
                index.to_string(),
                name.clone(),
                kind_name(channel::classify(name)).to_string(),
            ],
        );
    }
    table
}

/// One row per bone with its tracks and first key
pub fn track_table(clip: &AnimationClip) -> Table {
    let mut table = titled(&["Bone", "Tracks", "First rotation", "First position"]);
    for channel in &clip.channels {
        let first = channel.keys.first();
        push_row(
            &mut table,
            [
                channel.bone.clone(),
                format!("{:?}", channel.tracks),
                first.map(|k| format_quat(k.rotation)).unwrap_or_default(),
                first.map(|k| format_vec3(k.translation)).unwrap_or_default(),
            ],
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_table() {
        let names = vec!["Bip01 rot".to_string(), "jaw_open".to_string()];
        let table = channel_table(&names);
        assert_eq!(table.len(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("rotation"));
        assert!(rendered.contains("value"));
    }

    #[test]
    fn test_empty_model_table() {
        assert!(surface_table(&SkeletalModel::default()).is_empty());
    }
}
