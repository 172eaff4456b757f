//! Gap closing: decides when a review has concluded
//!
//! A review closes once every tracked detection has ended and more than the
//! profile's gap has elapsed on the wall clock since the latest end time.

use crate::domain::review::ReviewInstance;

/// Outcome of a gap check for one review
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GapCheck {
    /// No detections tracked yet
    Empty,
    /// At least one detection is still in progress
    Active { active_events: usize },
    /// Everything ended, still inside the gap
    Waiting { elapsed_secs: f64, gap_secs: u64 },
    /// Gap elapsed: close the review
    Elapsed { elapsed_secs: f64 },
}

impl GapCheck {
    #[inline]
    pub fn should_close(&self) -> bool {
        matches!(self, GapCheck::Elapsed { .. })
    }
}

pub fn evaluate(review: &ReviewInstance, now: f64) -> GapCheck {
    if review.detections.is_empty() {
        return GapCheck::Empty;
    }

    let active_events = review.active_count();
    if active_events > 0 {
        return GapCheck::Active { active_events };
    }

    let max_end = review
        .detections
        .values()
        .map(|tracked| tracked.state.end_time)
        .fold(0.0_f64, f64::max);
    let elapsed_secs = now - max_end;
    let gap_secs = review.profile.gap;
    if elapsed_secs > gap_secs as f64 {
        GapCheck::Elapsed { elapsed_secs }
    } else {
        GapCheck::Waiting { elapsed_secs, gap_secs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DetectionState, Profile};
    use std::sync::Arc;

    fn review(gap: u64, ends: &[f64]) -> ReviewInstance {
        let profile = Profile { name: "p".to_string(), gap, ..Default::default() };
        let mut review = ReviewInstance::new(Arc::new(profile), 0.0);
        for (i, &end_time) in ends.iter().enumerate() {
            let state = DetectionState { id: format!("e{i}"), start_time: 1000.0, end_time, ..Default::default() };
            review.upsert_detection(state, 0.0);
        }
        review
    }

    #[test]
    fn test_empty_review_never_closes() {
        let check = evaluate(&review(1, &[]), 1_000_000.0);
        assert_eq!(check, GapCheck::Empty);
        assert!(!check.should_close());
    }

    #[test]
    fn test_active_detection_blocks_close() {
        let check = evaluate(&review(1, &[1010.0, 0.0]), 1_000_000.0);
        assert_eq!(check, GapCheck::Active { active_events: 1 });
        assert!(!check.should_close());
    }

    #[test]
    fn test_active_count_drops_as_detections_end() {
        let mut r = review(5, &[0.0, 0.0, 1010.0]);
        assert_eq!(evaluate(&r, 2000.0), GapCheck::Active { active_events: 2 });

        let ended = DetectionState { id: "e0".to_string(), start_time: 1000.0, end_time: 1020.0, ..Default::default() };
        r.upsert_detection(ended, 0.0);
        assert_eq!(r.active_count(), 1);
        assert_eq!(evaluate(&r, 2000.0), GapCheck::Active { active_events: 1 });

        let ended = DetectionState { id: "e1".to_string(), start_time: 1000.0, end_time: 1030.0, ..Default::default() };
        r.upsert_detection(ended, 0.0);
        assert_eq!(r.active_count(), 0);
        assert_eq!(evaluate(&r, 1034.0), GapCheck::Waiting { elapsed_secs: 4.0, gap_secs: 5 });
    }

    #[test]
    fn test_gap_boundary() {
        let r = review(30, &[1010.0, 1020.0]);

        assert!(!evaluate(&r, 1040.0).should_close());
        assert_eq!(evaluate(&r, 1050.0), GapCheck::Waiting { elapsed_secs: 30.0, gap_secs: 30 });
        assert!(!evaluate(&r, 1050.0).should_close());
        assert!(evaluate(&r, 1050.5).should_close());
    }

    #[test]
    fn test_uses_latest_end_time() {
        let r = review(5, &[1000.0, 1100.0]);
        assert!(!evaluate(&r, 1104.0).should_close());
        assert!(evaluate(&r, 1106.0).should_close());
    }
}
