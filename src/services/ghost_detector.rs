//! Ghost detection: force-closes detections that stopped being refreshed
//!
//! A detection is a ghost when it still reports `end_time == 0` but has not
//! been seen for longer than the ghost timeout. Its end time is set to the
//! local wall clock, which is a different clock from the source's
//! `start_time`, so durations across the two are approximate.

use crate::domain::review::ReviewInstance;
use std::time::Duration;
use tracing::{debug, warn};

/// Default ghost timeout (seconds)
pub const DEFAULT_GHOST_TIMEOUT_SECS: u64 = 300;

/// Close stale active detections in a review
///
/// Returns the ids of the detections closed on this sweep. `last_seen` is
/// left untouched; with a non-zero end time the detection no longer
/// qualifies on later sweeps.
pub fn sweep(review: &mut ReviewInstance, now: f64, timeout: Duration) -> Vec<String> {
    let timeout_secs = timeout.as_secs_f64();
    let mut closed = Vec::new();

    for (id, tracked) in review.detections.iter_mut() {
        if !tracked.state.is_active() {
            continue;
        }

        let idle_secs = now - tracked.last_seen;
        if idle_secs > timeout_secs {
            warn!(
                detection_id = %id,
                review_id = %review.id,
                idle_secs = format!("{:.1}", idle_secs),
                timeout_secs = %timeout.as_secs(),
                "ghost_detection_closed"
            );
            tracked.state.end_time = now;
            closed.push(id.clone());
        }
    }

    if !closed.is_empty() {
        review.last_updated = now;
        debug!(review_id = %review.id, closed = %closed.len(), "ghost_sweep_done");
    }

    closed
}
