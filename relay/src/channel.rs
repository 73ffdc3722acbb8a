use crate::metrics::{COMMANDS_PUBLISHED_TOTAL, PUBLISH_FAILURES_TOTAL};
use rumqttc::{AsyncClient, QoS};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Outbound side of the message channel.
///
/// Publishing is fire-and-forget: implementations never block and never report
/// failure to the caller.
pub trait Publisher: Send + Sync {
    fn publish(&self, topic: &str, payload: Vec<u8>);
}

/// Serializes `message` as JSON and publishes it.
pub fn publish_json<T: Serialize>(publisher: &dyn Publisher, topic: &str, message: &T) {
    match serde_json::to_vec(message) {
        Ok(payload) => publisher.publish(topic, payload),
        Err(e) => error!("Failed to serialize message for {}: {}", topic, e),
    }
}

#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) {
        let size = payload.len();
        match self.client.try_publish(topic, QoS::AtMostOnce, false, payload) {
            Ok(()) => {
                COMMANDS_PUBLISHED_TOTAL.inc();
                debug!("Queued {} bytes for {}", size, topic);
            }
            Err(e) => {
                PUBLISH_FAILURES_TOTAL.inc();
                warn!("Dropping message for {}: {}", topic, e);
            }
        }
    }
}
