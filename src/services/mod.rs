//! Services - correlation logic and review state
//!
//! This module contains the core business logic services:
//! - `engine` - Single decision loop driving the review lifecycle
//! - `matcher` - Profile matching for detections
//! - `review_store` - Open reviews keyed by profile
//! - `projector` - Review summaries for publishing
//! - `ghost_detector` - Force-closes detections that went silent
//! - `gap_closer` - Decides when a review has concluded

pub mod engine;
pub mod gap_closer;
pub mod ghost_detector;
pub mod matcher;
pub mod projector;
pub mod review_store;

// Re-export commonly used types
pub use engine::{create_ingest_channel, Engine, INGEST_QUEUE_CAPACITY, TICK_INTERVAL};
pub use review_store::ReviewStore;
