//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `mqtt` - MQTT client for receiving Frigate detection events
//! - `mqtt_egress` - MQTT publisher for review messages
//! - `egress` - Review messages to file (JSONL format)
//! - `publisher` - Publishing capability the engine depends on
//! - `frigate` - Frigate HTTP API client for the startup snapshot
//! - `prometheus` - Prometheus metrics HTTP endpoint

pub mod egress;
pub mod frigate;
pub mod mqtt;
pub mod mqtt_egress;
pub mod prometheus;
pub mod publisher;

// Re-export commonly used types
pub use egress::JsonlPublisher;
pub use frigate::{FrigateClient, FrigateError};
pub use mqtt_egress::MqttReviewPublisher;
pub use publisher::{PublishError, ReviewPublisher};
