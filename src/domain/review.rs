//! Review data model: stitched sessions of related detections

use crate::domain::types::{new_uuid_v7, DetectionState, Profile};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Review lifecycle
///
/// `Ended` is never stored: a review is evicted the moment it ends and the
/// state only shows up in the final `end` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewLifecycle {
    Active,
    Ended,
}

impl ReviewLifecycle {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewLifecycle::Active => "active",
            ReviewLifecycle::Ended => "ended",
        }
    }
}

/// A detection tracked inside a review
#[derive(Debug, Clone)]
pub struct TrackedDetection {
    /// Latest state reported by the source
    pub state: DetectionState,
    /// Local wall clock (epoch seconds) of the last refresh, used only for
    /// ghost detection. Never compared against the source's own timestamps.
    pub last_seen: f64,
}

/// Runtime state of an open review
#[derive(Debug, Clone)]
pub struct ReviewInstance {
    pub id: String,
    pub profile: Arc<Profile>,
    /// Tracked detections keyed by detection id
    pub detections: FxHashMap<String, TrackedDetection>,
    pub lifecycle: ReviewLifecycle,
    /// Set only after a real publish succeeded
    pub sent_first: bool,
    /// Local wall clock (epoch seconds) of the last mutation
    pub last_updated: f64,
}

impl ReviewInstance {
    pub fn new(profile: Arc<Profile>, now: f64) -> Self {
        Self {
            id: new_uuid_v7(),
            profile,
            detections: FxHashMap::default(),
            lifecycle: ReviewLifecycle::Active,
            sent_first: false,
            last_updated: now,
        }
    }

    /// Insert or replace a tracked detection and refresh its last-seen time
    ///
    /// A non-zero end time is sticky: an update reporting `end_time == 0`
    /// for a detection that already ended keeps the earlier end time.
    pub fn upsert_detection(&mut self, mut state: DetectionState, now: f64) {
        if state.is_active() {
            if let Some(previous) = self.detections.get(&state.id) {
                if !previous.state.is_active() {
                    state.end_time = previous.state.end_time;
                }
            }
        }
        self.detections.insert(state.id.clone(), TrackedDetection { state, last_seen: now });
        self.last_updated = now;
    }

    pub fn detection(&self, id: &str) -> Option<&TrackedDetection> {
        self.detections.get(id)
    }

    pub fn active_count(&self) -> usize {
        self.detections.values().filter(|t| t.state.is_active()).count()
    }

    #[inline]
    pub fn mark_published(&mut self) {
        self.sent_first = true;
    }
}

/// `(id, camera)` pair for a detection linked to a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedEvent {
    pub id: String,
    pub camera: String,
}

/// Publishable projection of a review, recomputed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    pub id: String,
    pub profile_name: String,
    pub state: ReviewLifecycle,
    pub start_time: f64,
    /// Present only once every tracked detection has ended
    pub end_time: Option<f64>,
    pub event_count: usize,
    pub active_events: usize,
    pub linked_events: Vec<LinkedEvent>,
    pub objects: Vec<String>,
    pub cameras: Vec<String>,
    pub zones: Vec<String>,
}

/// Kind of lifecycle message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    New,
    Update,
    End,
}

impl MessageKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::New => "new",
            MessageKind::Update => "update",
            MessageKind::End => "end",
        }
    }
}

/// Message published on the reviews topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub before: Option<ReviewState>,
    pub after: Option<ReviewState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: &str, end_time: f64) -> DetectionState {
        DetectionState {
            id: id.to_string(),
            camera: "cam1".to_string(),
            label: "person".to_string(),
            start_time: 1000.0,
            end_time,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_review_is_active_and_unpublished() {
        let review = ReviewInstance::new(Arc::new(Profile::default()), 5.0);
        assert_eq!(review.lifecycle, ReviewLifecycle::Active);
        assert!(!review.sent_first);
        assert!(review.detections.is_empty());
        assert_eq!(review.last_updated, 5.0);
        assert_eq!(review.id.len(), 36);
    }

    #[test]
    fn test_upsert_refreshes_last_seen() {
        let mut review = ReviewInstance::new(Arc::new(Profile::default()), 0.0);
        review.upsert_detection(state("e1", 0.0), 10.0);
        review.upsert_detection(state("e1", 0.0), 20.0);

        assert_eq!(review.detections.len(), 1);
        assert_eq!(review.detection("e1").unwrap().last_seen, 20.0);
        assert_eq!(review.last_updated, 20.0);
        assert_eq!(review.active_count(), 1);
    }

    #[test]
    fn test_end_time_is_sticky() {
        let mut review = ReviewInstance::new(Arc::new(Profile::default()), 0.0);
        review.upsert_detection(state("e1", 1010.0), 1.0);
        review.upsert_detection(state("e1", 0.0), 2.0);
        assert_eq!(review.detection("e1").unwrap().state.end_time, 1010.0);

        // A later end time from the source still wins
        review.upsert_detection(state("e1", 1020.0), 3.0);
        assert_eq!(review.detection("e1").unwrap().state.end_time, 1020.0);
    }

    #[test]
    fn test_message_serialization() {
        let msg = ReviewMessage {
            kind: MessageKind::New,
            before: None,
            after: Some(ReviewState {
                id: "r1".to_string(),
                profile_name: "p".to_string(),
                state: ReviewLifecycle::Active,
                start_time: 1000.0,
                end_time: None,
                event_count: 1,
                active_events: 1,
                linked_events: vec![LinkedEvent { id: "e1".to_string(), camera: "cam1".to_string() }],
                objects: vec!["person".to_string()],
                cameras: vec!["cam1".to_string()],
                zones: vec![],
            }),
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "new");
        assert!(value["before"].is_null());
        assert_eq!(value["after"]["state"], "active");
        assert!(value["after"]["end_time"].is_null());
        assert_eq!(value["after"]["linked_events"][0]["camera"], "cam1");
    }
}
