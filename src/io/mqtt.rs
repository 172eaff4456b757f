//! MQTT client for receiving Frigate detection events

use crate::domain::types::FrigateEvent;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Why an inbound payload was dropped
#[derive(Debug, PartialEq, Error)]
pub enum DecodeError {
    #[error("invalid UTF-8")]
    Utf8,

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("missing after.id")]
    MissingId,
}

/// Decode a `frigate/events` payload
pub fn parse_frigate_event(payload: &[u8]) -> Result<FrigateEvent, DecodeError> {
    let json_str = std::str::from_utf8(payload).map_err(|_| DecodeError::Utf8)?;
    let event: FrigateEvent =
        serde_json::from_str(json_str).map_err(|e| DecodeError::Json(e.to_string()))?;
    if event.after.id.is_empty() {
        return Err(DecodeError::MissingId);
    }
    Ok(event)
}

/// Start the MQTT client and send decoded detections to the ingest queue
///
/// Sends await queue capacity, so a full queue blocks this loop (and with it
/// the broker connection) until the engine catches up. Malformed payloads are
/// dropped with a warning. Returns on shutdown or when the queue closes.
pub async fn start_mqtt_client(
    config: &Config,
    event_tx: mpsc::Sender<FrigateEvent>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut mqttoptions =
        MqttOptions::new(config.mqtt_client_id(), config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));

    // Set credentials if configured
    if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
        mqttoptions.set_credentials(username, password);
    }

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);
    let topic = config.mqtt_events_topic().to_string();

    loop {
        tokio::select! {
            // Check for shutdown signal
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mqtt_shutdown");
                    return Ok(());
                }
            }
            // Process MQTT events
            result = eventloop.poll() => {
                match result {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let event = match parse_frigate_event(&publish.payload) {
                            Ok(event) => event,
                            Err(e) => {
                                metrics.record_detection_malformed();
                                warn!(topic = %publish.topic, error = %e, "detection_malformed");
                                continue;
                            }
                        };

                        debug!(
                            detection_id = %event.after.id,
                            kind = %event.kind,
                            camera = %event.after.camera,
                            label = %event.after.label,
                            "detection_received"
                        );

                        if event_tx.send(event).await.is_err() {
                            warn!("Event channel closed");
                            return Ok(());
                        }
                        let depth = event_tx.max_capacity() - event_tx.capacity();
                        metrics.set_event_queue_depth(depth as u64);
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // Resubscribe on every connect; clean sessions drop subscriptions
                        client.subscribe(topic.as_str(), QoS::AtMostOnce).await?;
                        info!(
                            topic = %topic,
                            host = %config.mqtt_host(),
                            port = %config.mqtt_port(),
                            "mqtt_connected"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "MQTT error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}
