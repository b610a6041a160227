//! Services - the two analyzers
//!
//! - `hit_path` - Resolves the id path to the topmost region drawn at a point
//! - `session_analyzer` - Counts visits, visitors and inactivity-separated sessions
//!
//! Both are pure and independent of each other.

pub mod hit_path;
pub mod session_analyzer;

// Re-export commonly used types
pub use hit_path::{resolve_path, Hit, HitPathResolver};
pub use session_analyzer::{
    is_chronological, summarize, VisitSessionAnalyzer, SESSION_DEADLINE_SECS,
};
