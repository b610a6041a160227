//! Shared types for scene hit-testing and visit analysis

use serde::{Deserialize, Deserializer, Serialize};

/// Newtype wrapper for visitor IDs to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(pub String);

impl VisitorId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VisitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VisitorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A query location in root (screen) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle with origin at its top-left corner.
///
/// A node's frame is relative to its parent's origin; the resolver converts it
/// to absolute coordinates with [`Frame::offset_by`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// Left edge (inclusive).
    pub x: f64,
    /// Top edge (inclusive).
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment: the top-left corner is inside, the bottom-right
    /// corner is outside.
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        self.x <= point.x && self.y <= point.y && point.x < self.max_x() && point.y < self.max_y()
    }

    /// Translate a parent-relative frame by the parent's absolute origin
    #[inline]
    pub fn offset_by(&self, parent: &Frame) -> Frame {
        Frame::new(parent.x + self.x, parent.y + self.y, self.width, self.height)
    }
}

/// A rectangular region in a scene tree.
///
/// Children are in paint order: later children draw on top of earlier ones
/// and on top of the parent. The tree must be finite with non-negative frame
/// dimensions; this is not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionNode {
    pub id: String,
    pub frame: Frame,
    #[serde(default)]
    pub children: Vec<RegionNode>,
}

impl RegionNode {
    pub fn new(id: impl Into<String>, frame: Frame) -> Self {
        Self { id: id.into(), frame, children: Vec::new() }
    }

    pub fn with_child(mut self, child: RegionNode) -> Self {
        self.children.push(child);
        self
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(RegionNode::node_count).sum::<usize>()
    }
}

/// A single timestamped record of a visitor's presence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub visitor_id: VisitorId,
    /// Seconds; loaders also accept RFC 3339 strings
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: i64,
}

impl VisitEvent {
    pub fn new(visitor_id: impl Into<String>, timestamp: i64) -> Self {
        Self { visitor_id: VisitorId(visitor_id.into()), timestamp }
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = i64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("integer seconds or an RFC 3339 timestamp")
        }

        fn visit_str<E>(self, value: &str) -> Result<i64, E>
        where
            E: de::Error,
        {
            chrono::DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.timestamp())
                .map_err(|e| E::custom(format!("invalid timestamp {value:?}: {e}")))
        }

        fn visit_i64<E>(self, value: i64) -> Result<i64, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<i64, E>
        where
            E: de::Error,
        {
            i64::try_from(value).map_err(|_| E::custom(format!("timestamp {value} out of range")))
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}
