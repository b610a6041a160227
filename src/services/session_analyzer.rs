//! Visit session segmentation
//!
//! A visitor's session ends when the gap to their next visit is strictly
//! greater than the session deadline (30 min by default); the next visit
//! opens a new session. Every visitor who appears contributes at least one.
//!
//! Input is expected in non-decreasing timestamp order. Grouping keeps each
//! visitor's timestamps in input order, so only the per-visitor order
//! matters for the session count.

use crate::domain::summary::{Session, VisitSummary};
use crate::domain::types::{VisitEvent, VisitorId};
use crate::infra::metrics::Metrics;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Default inactivity gap that ends a session (30 minutes)
pub const SESSION_DEADLINE_SECS: i64 = 30 * 60;

type Timeline = SmallVec<[i64; 4]>;

/// Computes visit, visitor and session counts over visit events
pub struct VisitSessionAnalyzer {
    deadline_secs: i64,
    metrics: Option<Arc<Metrics>>,
}

impl VisitSessionAnalyzer {
    pub fn new() -> Self {
        Self { deadline_secs: SESSION_DEADLINE_SECS, metrics: None }
    }

    /// Create an analyzer with metrics recording
    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self { deadline_secs: SESSION_DEADLINE_SECS, metrics: Some(metrics) }
    }

    /// Override the session deadline
    pub fn with_deadline_secs(mut self, deadline_secs: i64) -> Self {
        self.deadline_secs = deadline_secs;
        self
    }

    pub fn deadline_secs(&self) -> i64 {
        self.deadline_secs
    }

    /// Total visits, distinct visitors and sessions
    pub fn summarize(&self, events: &[VisitEvent]) -> VisitSummary {
        let started = Instant::now();

        let timelines = group_by_visitor(events);
        let session_count =
            timelines.values().map(|timeline| count_sessions(timeline, self.deadline_secs)).sum();

        let summary = VisitSummary {
            total_visits: events.len(),
            unique_visitors: timelines.len(),
            session_count,
        };

        debug!(
            total_visits = summary.total_visits,
            unique_visitors = summary.unique_visitors,
            sessions = summary.session_count,
            deadline_secs = self.deadline_secs,
            "visits_summarized"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_summary(
                summary.total_visits,
                summary.session_count,
                started.elapsed().as_micros() as u64,
            );
        }

        summary
    }

    /// Every session as a span, ordered by start time then visitor
    pub fn sessions(&self, events: &[VisitEvent]) -> Vec<Session> {
        let timelines = group_by_visitor(events);
        let mut sessions = Vec::new();

        for (visitor_id, timeline) in timelines {
            let mut start = 0;
            for i in 1..=timeline.len() {
                let closes = i == timeline.len()
                    || timeline[i].saturating_sub(timeline[i - 1]) > self.deadline_secs;
                if closes {
                    sessions.push(Session {
                        visitor_id: visitor_id.clone(),
                        started_at: timeline[start],
                        ended_at: timeline[i - 1],
                        visits: i - start,
                    });
                    start = i;
                }
            }
        }

        sessions.sort_by(|a, b| {
            a.started_at.cmp(&b.started_at).then_with(|| a.visitor_id.cmp(&b.visitor_id))
        });

        debug!(sessions = sessions.len(), "session_spans_built");
        sessions
    }
}

impl Default for VisitSessionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Summarize with the default 30 minute deadline and no metrics
pub fn summarize(events: &[VisitEvent]) -> VisitSummary {
    VisitSessionAnalyzer::new().summarize(events)
}

/// Whether `events` are in non-decreasing timestamp order
pub fn is_chronological(events: &[VisitEvent]) -> bool {
    events.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp)
}

/// Map each visitor to their timestamps in input order
fn group_by_visitor(events: &[VisitEvent]) -> FxHashMap<&VisitorId, Timeline> {
    let mut timelines: FxHashMap<&VisitorId, Timeline> = FxHashMap::default();
    for event in events {
        timelines.entry(&event.visitor_id).or_default().push(event.timestamp);
    }
    timelines
}

/// One session plus one per gap strictly above the deadline
fn count_sessions(timeline: &[i64], deadline_secs: i64) -> usize {
    1 + timeline
        .windows(2)
        .filter(|pair| pair[1].saturating_sub(pair[0]) > deadline_secs)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visits(raw: &[(&str, i64)]) -> Vec<VisitEvent> {
        raw.iter().map(|(id, ts)| VisitEvent::new(*id, *ts)).collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(summarize(&[]).as_tuple(), (0, 0, 0));
        assert!(VisitSessionAnalyzer::new().sessions(&[]).is_empty());
    }

    #[test]
    fn test_single_visit_is_one_session() {
        assert_eq!(summarize(&visits(&[("a", 42)])).as_tuple(), (1, 1, 1));
    }

    #[test]
    fn test_gap_above_deadline_splits() {
        let events = visits(&[("a", 0), ("a", 100), ("a", 5000)]);
        let summary = summarize(&events);
        assert_eq!(summary.total_visits, 3);
        assert_eq!(summary.unique_visitors, 1);
        assert_eq!(summary.session_count, 2);
    }

    #[test]
    fn test_gap_exactly_deadline_does_not_split() {
        let events = visits(&[("a", 0), ("a", 1800)]);
        assert_eq!(summarize(&events).session_count, 1);

        let events = visits(&[("a", 0), ("a", 1801)]);
        assert_eq!(summarize(&events).session_count, 2);
    }

    #[test]
    fn test_identical_timestamps_same_session() {
        let events = visits(&[("a", 10), ("a", 10), ("a", 10)]);
        assert_eq!(summarize(&events).as_tuple(), (3, 1, 1));
    }

    #[test]
    fn test_two_visitors_single_visit_each() {
        let events = visits(&[("a", 0), ("b", 5)]);
        assert_eq!(summarize(&events).as_tuple(), (2, 2, 2));
    }

    #[test]
    fn test_interleaved_visitors_grouped_independently() {
        // a: 0, 1000, 3000 (one split); b: 500, 2000 (no split)
        let events = visits(&[("a", 0), ("b", 500), ("a", 1000), ("b", 2000), ("a", 3000)]);
        assert_eq!(summarize(&events).as_tuple(), (5, 2, 3));
    }

    #[test]
    fn test_gaps_between_consecutive_visits_only() {
        // First-to-last is far beyond the deadline but no single gap exceeds it
        let events = visits(&[("a", 0), ("a", 1700), ("a", 3400), ("a", 5100)]);
        assert_eq!(summarize(&events).session_count, 1);
    }

    #[test]
    fn test_custom_deadline() {
        let events = visits(&[("a", 0), ("a", 61), ("a", 100)]);
        let analyzer = VisitSessionAnalyzer::new().with_deadline_secs(60);
        assert_eq!(analyzer.deadline_secs(), 60);
        assert_eq!(analyzer.summarize(&events).session_count, 2);
    }

    #[test]
    fn test_session_spans() {
        let events =
            visits(&[("b", 0), ("a", 0), ("a", 100), ("b", 2000), ("a", 4000), ("a", 4100)]);
        let analyzer = VisitSessionAnalyzer::new();
        let sessions = analyzer.sessions(&events);

        assert_eq!(sessions.len(), analyzer.summarize(&events).session_count);
        let spans: Vec<(&str, i64, i64, usize)> = sessions
            .iter()
            .map(|s| (s.visitor_id.as_str(), s.started_at, s.ended_at, s.visits))
            .collect();
        assert_eq!(
            spans,
            vec![("a", 0, 100, 2), ("b", 0, 0, 1), ("b", 2000, 2000, 1), ("a", 4000, 4100, 2)]
        );
    }

    #[test]
    fn test_is_chronological() {
        assert!(is_chronological(&[]));
        assert!(is_chronological(&visits(&[("a", 1), ("b", 1), ("a", 2)])));
        assert!(!is_chronological(&visits(&[("a", 2), ("b", 1)])));
    }

    #[test]
    fn test_unsorted_input_keeps_counts() {
        // Negative gaps never split; totals stay exact
        let events = visits(&[("a", 5000), ("a", 0), ("b", 10)]);
        let summary = summarize(&events);
        assert_eq!(summary.total_visits, 3);
        assert_eq!(summary.unique_visitors, 2);
        assert_eq!(summary.session_count, 2);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let events = visits(&[("a", i64::MIN), ("a", i64::MAX)]);
        assert_eq!(summarize(&events).session_count, 2);
    }

    #[test]
    fn test_reversed_extreme_span_has_duration() {
        let events = visits(&[("a", i64::MAX), ("a", i64::MIN)]);
        let sessions = VisitSessionAnalyzer::new().sessions(&events);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].started_at, i64::MAX);
        assert_eq!(sessions[0].ended_at, i64::MIN);
        assert_eq!(sessions[0].duration_secs(), u64::MAX);
    }

    #[test]
    fn test_metrics_recorded() {
        let metrics = Arc::new(Metrics::new());
        let analyzer = VisitSessionAnalyzer::with_metrics(metrics.clone());

        analyzer.summarize(&visits(&[("a", 0), ("a", 5000)]));

        let report = metrics.report();
        assert_eq!(report.summaries_total, 1);
        assert_eq!(report.visits_total, 2);
        assert_eq!(report.sessions_total, 2);
    }
}
