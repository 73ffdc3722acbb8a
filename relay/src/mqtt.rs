use crate::config::Config;
use crate::errors::{Error, Result};
use crate::metrics::INVALID_REPORTS_TOTAL;
use crate::model::DeviceReport;
use crate::topics::TOPIC_SCHEDULE_STATUS;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const REQUEST_CAPACITY: usize = 64;

pub fn connect(config: &Config, client_id: String) -> (AsyncClient, EventLoop) {
    info!(
        "Connecting to MQTT broker at {}:{}",
        config.mqtt_broker, config.mqtt_port
    );

    let mut mqtt_options =
        MqttOptions::new(client_id, config.mqtt_broker.clone(), config.mqtt_port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);

    AsyncClient::new(mqtt_options, REQUEST_CAPACITY)
}

/// Drives the MQTT connection and forwards device reports to `tx`.
///
/// Runs until the report channel closes.
pub async fn run_mqtt(
    client: AsyncClient,
    mut eventloop: EventLoop,
    tx: mpsc::Sender<DeviceReport>,
) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("MQTT connected");
                // clean sessions forget subscriptions, so subscribe on every connect
                match client.try_subscribe(TOPIC_SCHEDULE_STATUS, QoS::AtLeastOnce) {
                    Ok(()) => info!("Subscribed to {}", TOPIC_SCHEDULE_STATUS),
                    Err(e) => error!("Subscribe to {} failed: {}", TOPIC_SCHEDULE_STATUS, e),
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    "Received message on topic {}, size: {} bytes",
                    publish.topic,
                    publish.payload.len()
                );

                if publish.topic != TOPIC_SCHEDULE_STATUS {
                    continue;
                }

                match process_message(&publish.payload, &tx).await {
                    Ok(()) => {}
                    Err(Error::ChannelSend) => {
                        info!("Report channel closed, stopping MQTT task");
                        return Ok(());
                    }
                    Err(e) => {
                        INVALID_REPORTS_TOTAL.inc();
                        warn!("Dropping device report: {}", e);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT error: {}", e);
                // rumqttc reconnects on the next poll
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

pub fn parse_report(payload: &[u8]) -> Result<DeviceReport> {
    serde_json::from_slice::<DeviceReport>(payload)
        .map_err(|e| Error::Validation(format!("JSON parse error: {}", e)))
}

/// Parses one status payload and hands it to the reconciler
async fn process_message(payload: &[u8], tx: &mpsc::Sender<DeviceReport>) -> Result<()> {
    let report = parse_report(payload)?;

    match tx.try_send(report) {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(report)) => {
            debug!("Report channel full, waiting");
            tx.send(report).await.map_err(|_| Error::ChannelSend)
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::ChannelSend),
    }
}
