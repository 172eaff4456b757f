//! MQTT publisher for review messages
//!
//! Publishes `new`/`update`/`end` review messages as JSON (QoS 0, not
//! retained) on the configured reviews topic.

use crate::domain::review::ReviewMessage;
use crate::infra::config::Config;
use crate::io::publisher::{PublishError, ReviewPublisher};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, info, warn};

/// MQTT review publisher
///
/// Owns its own broker connection; the eventloop runs on a spawned task.
pub struct MqttReviewPublisher {
    client: AsyncClient,
}

impl MqttReviewPublisher {
    /// Create a new MQTT publisher
    ///
    /// Connects to the broker at the configured MQTT host/port. Must be
    /// called from within a tokio runtime.
    pub fn new(config: &Config) -> Self {
        let client_id = format!("{}-egress-{}", config.mqtt_client_id(), std::process::id());
        let mut mqttoptions = MqttOptions::new(client_id, config.mqtt_host(), config.mqtt_port());
        mqttoptions.set_keep_alive(Duration::from_secs(30));
        mqttoptions.set_clean_session(true);

        // Set credentials if configured
        if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
            mqttoptions.set_credentials(username, password);
        }

        let (client, eventloop) = AsyncClient::new(mqttoptions, 100);

        // Spawn the eventloop handler
        tokio::spawn(async move {
            let mut eventloop = eventloop;
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("mqtt_egress_connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "mqtt_egress_error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self { client }
    }
}

#[async_trait]
impl ReviewPublisher for MqttReviewPublisher {
    async fn publish(&self, topic: &str, message: &ReviewMessage) -> Result<(), PublishError> {
        let json = serde_json::to_vec(message)?;
        let bytes = json.len();
        self.client.publish(topic, QoS::AtMostOnce, false, json).await?;
        debug!(topic = %topic, kind = %message.kind.as_str(), bytes = %bytes, "mqtt_egress_published");
        Ok(())
    }
}
