//! Result types produced by the analyzers

use crate::domain::types::VisitorId;
use serde::Serialize;

/// Aggregate statistics over a list of visit events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VisitSummary {
    pub total_visits: usize,
    pub unique_visitors: usize,
    pub session_count: usize,
}

impl VisitSummary {
    /// Tuple form `(total_visits, unique_visitors, session_count)`
    #[inline]
    pub fn as_tuple(&self) -> (usize, usize, usize) {
        (self.total_visits, self.unique_visitors, self.session_count)
    }
}

/// One session: a maximal run of a visitor's events with no gap above the
/// session deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub visitor_id: VisitorId,
    pub started_at: i64,
    pub ended_at: i64,
    pub visits: usize,
}

impl Session {
    /// Seconds between the first and last visit. Unsorted input can put
    /// `ended_at` before `started_at`; the distance is still reported.
    #[inline]
    pub fn duration_secs(&self) -> u64 {
        self.ended_at.abs_diff(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_tuple() {
        let summary = VisitSummary { total_visits: 3, unique_visitors: 1, session_count: 2 };
        assert_eq!(summary.as_tuple(), (3, 1, 2));
        assert_eq!(VisitSummary::default().as_tuple(), (0, 0, 0));
    }

    #[test]
    fn test_session_serializes_visitor_as_string() {
        let session =
            Session { visitor_id: VisitorId::from("v1"), started_at: 10, ended_at: 70, visits: 2 };
        assert_eq!(session.duration_secs(), 60);
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["visitor_id"], "v1");
        assert_eq!(json["visits"], 2);
    }

    #[test]
    fn test_duration_of_reversed_extreme_span() {
        let session = Session {
            visitor_id: VisitorId::from("a"),
            started_at: i64::MAX,
            ended_at: i64::MIN,
            visits: 2,
        };
        assert_eq!(session.duration_secs(), u64::MAX);
    }
}
