//! Publishing capability used by the engine
//!
//! The engine only knows this trait; the transport (MQTT, JSONL file) is
//! chosen by the binary.

use crate::domain::review::ReviewMessage;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("mqtt: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Publishes review lifecycle messages
///
/// Implementations report failure; they never retry on their own.
#[async_trait]
pub trait ReviewPublisher: Send + Sync {
    async fn publish(&self, topic: &str, message: &ReviewMessage) -> Result<(), PublishError>;
}

#[async_trait]
impl<T: ReviewPublisher + ?Sized> ReviewPublisher for Box<T> {
    async fn publish(&self, topic: &str, message: &ReviewMessage) -> Result<(), PublishError> {
        (**self).publish(topic, message).await
    }
}
