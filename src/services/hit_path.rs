//! Hit path resolution over a tree of nested regions
//!
//! Walks from the root towards the deepest region drawn at a point:
//! - Frames are parent-relative; absolute frames are accumulated on the way down
//! - Containment is half-open (top-left inside, bottom-right outside)
//! - Among overlapping siblings the last declared one is on top and wins;
//!   earlier siblings and their subtrees are never visited
//! - The id path is deduplicated keeping first occurrences

use crate::domain::types::{Frame, Point, RegionNode};
use crate::infra::metrics::Metrics;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Deepest region drawn at a point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: String,
    /// Frame in root coordinates
    pub frame: Frame,
    /// Number of nodes walked from the root to this one (root = 1)
    pub depth: usize,
}

/// Resolves hit paths in region trees
#[derive(Default)]
pub struct HitPathResolver {
    metrics: Option<Arc<Metrics>>,
}

impl HitPathResolver {
    pub fn new() -> Self {
        Self { metrics: None }
    }

    /// Create a resolver with metrics recording
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self { metrics: Some(metrics) }
    }

    /// Ordered, deduplicated ids from the root to the deepest region drawn at
    /// `point`. Empty when the point lies outside the root frame.
    pub fn resolve_path(&self, root: &RegionNode, point: Point) -> Vec<String> {
        let started = Instant::now();

        let mut walked = Vec::new();
        walk(root, root.frame, point, &mut walked);
        let path = dedup_ids(walked.iter().map(|(node, _)| node.id.as_str()));

        debug!(
            x = %point.x,
            y = %point.y,
            walked = walked.len(),
            path_len = path.len(),
            "hit_path_resolved"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_path_resolved(path.len(), started.elapsed().as_micros() as u64);
        }

        path
    }

    /// The deepest region drawn at `point` with its absolute frame
    pub fn hit(&self, root: &RegionNode, point: Point) -> Option<Hit> {
        let mut walked = Vec::new();
        walk(root, root.frame, point, &mut walked);

        let depth = walked.len();
        let (node, frame) = walked.pop()?;
        Some(Hit { id: node.id.clone(), frame, depth })
    }
}

/// Resolve a hit path without metrics
pub fn resolve_path(root: &RegionNode, point: Point) -> Vec<String> {
    HitPathResolver::new().resolve_path(root, point)
}

/// Push every node on the hit chain below (and including) `node`, whose
/// absolute frame is `frame`
fn walk<'a>(
    node: &'a RegionNode,
    frame: Frame,
    point: Point,
    walked: &mut Vec<(&'a RegionNode, Frame)>,
) {
    if !frame.contains(point) {
        return;
    }
    walked.push((node, frame));

    // Reverse paint order: the first viable child is the topmost one
    let topmost = node
        .children
        .iter()
        .rev()
        .map(|child| (child, child.frame.offset_by(&frame)))
        .find(|(_, child_frame)| child_frame.contains(point));

    if let Some((child, child_frame)) = topmost {
        walk(child, child_frame, point, walked);
    }
}

/// Keep the first occurrence of each id, preserving order
fn dedup_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    ids.filter(|id| seen.insert(*id)).map(str::to_string).collect()
}
