//! Domain models - scene regions, visit events and analysis results
//!
//! - `types` - `RegionNode`, `Frame`, `Point`, `VisitEvent`, `VisitorId`
//! - `summary` - `VisitSummary` and per-visitor `Session` spans

pub mod summary;
pub mod types;

pub use summary::{Session, VisitSummary};
pub use types::{Frame, Point, RegionNode, VisitEvent, VisitorId};
