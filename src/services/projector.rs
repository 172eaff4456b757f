//! Projection of a review into its publishable summary

use crate::domain::review::{LinkedEvent, ReviewInstance, ReviewState};
use std::collections::BTreeSet;

/// Compute the summary of a review from its tracked detections
///
/// `end_time` is only set once every detection has ended. Label, camera and
/// zone sets come out sorted; linked events are ordered by start time.
pub fn project(review: &ReviewInstance) -> ReviewState {
    let mut start_time: Option<f64> = None;
    let mut max_end = 0.0_f64;
    let mut active_events = 0;
    let mut linked = Vec::with_capacity(review.detections.len());
    let mut objects = BTreeSet::new();
    let mut cameras = BTreeSet::new();
    let mut zones = BTreeSet::new();

    for tracked in review.detections.values() {
        let state = &tracked.state;

        start_time = Some(match start_time {
            Some(current) => current.min(state.start_time),
            None => state.start_time,
        });

        if state.is_active() {
            active_events += 1;
        } else {
            max_end = max_end.max(state.end_time);
        }

        linked.push((state.start_time, LinkedEvent { id: state.id.clone(), camera: state.camera.clone() }));
        objects.insert(state.label.clone());
        cameras.insert(state.camera.clone());
        zones.extend(state.entered_zones.iter().cloned());
    }

    linked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

    let all_ended = active_events == 0 && !review.detections.is_empty();

    ReviewState {
        id: review.id.clone(),
        profile_name: review.profile.name.clone(),
        state: review.lifecycle,
        start_time: start_time.unwrap_or_default(),
        end_time: all_ended.then_some(max_end),
        event_count: review.detections.len(),
        active_events,
        linked_events: linked.into_iter().map(|(_, event)| event).collect(),
        objects: objects.into_iter().collect(),
        cameras: cameras.into_iter().collect(),
        zones: zones.into_iter().collect(),
    }
}
