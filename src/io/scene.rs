//! Scene loader - reads a region tree from a JSON file
//!
//! Format:
//! `{"id": "root", "frame": {"x": 0, "y": 0, "width": 100, "height": 100},
//!   "children": [...]}` where `children` may be omitted on leaves.

use crate::domain::types::RegionNode;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::info;

/// Parse a region tree from JSON text
pub fn parse_scene(json: &str) -> anyhow::Result<RegionNode> {
    serde_json::from_str(json).context("Invalid scene JSON")
}

/// Load a region tree from a JSON file
pub fn load_scene<P: AsRef<Path>>(path: P) -> anyhow::Result<RegionNode> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene file {}", path.display()))?;
    let root = parse_scene(&content)
        .with_context(|| format!("Failed to parse scene file {}", path.display()))?;

    info!(
        file = %path.display(),
        root = %root.id,
        nodes = root.node_count(),
        "scene_loaded"
    );

    Ok(root)
}
