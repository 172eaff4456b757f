//! Domain models - detections, profiles and reviews
//!
//! This module contains the canonical data types used throughout the system:
//! - `FrigateEvent` / `DetectionState` - detections from the NVR event bus
//! - `Profile` - user-defined matching rule
//! - `ReviewInstance` - runtime state of an open review
//! - `ReviewState` / `ReviewMessage` - published review summaries

pub mod review;
pub mod types;

// Re-export commonly used types at module level
pub use review::{
    LinkedEvent, MessageKind, ReviewInstance, ReviewLifecycle, ReviewMessage, ReviewState,
    TrackedDetection,
};
pub use types::{epoch_secs, DetectionState, FrigateEvent, Profile};
