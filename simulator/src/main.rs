mod device;
mod telemetry;

use clap::Parser;
use device::{Device, TOPIC_AC_CONTROL, TOPIC_SCHEDULE_ENABLED, TOPIC_SCHEDULE_STATUS};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use telemetry::Telemetry;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Emulates the office device: posts telemetry over HTTP and answers schedule
/// commands over MQTT
#[derive(Debug, Parser)]
struct Args {
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:3789")]
    relay_url: String,

    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    mqtt_broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    mqtt_port: u16,

    #[arg(long, env = "TELEMETRY_INTERVAL_SECS", default_value_t = 5)]
    telemetry_interval_secs: u64,

    #[arg(long, env = "HEARTBEAT_INTERVAL_SECS", default_value_t = 60)]
    heartbeat_interval_secs: u64,

    /// Never apply schedule commands
    #[arg(long)]
    drop_commands: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting office device simulator");
    info!(
        "Relay: {}, broker: {}:{}, drop commands: {}",
        args.relay_url, args.mqtt_broker, args.mqtt_port, args.drop_commands
    );

    let client_id = format!("office-device-{}", uuid::Uuid::new_v4());
    let mut mqtt_options = MqttOptions::new(client_id, &args.mqtt_broker, args.mqtt_port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);

    tokio::spawn(post_telemetry(
        args.relay_url.clone(),
        Duration::from_secs(args.telemetry_interval_secs.max(1)),
    ));

    let mut device = Device::new(args.drop_commands);
    let mut heartbeat =
        tokio::time::interval(Duration::from_secs(args.heartbeat_interval_secs.max(1)));

    loop {
        tokio::select! {
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("MQTT connected");
                    for topic in [TOPIC_AC_CONTROL, TOPIC_SCHEDULE_ENABLED] {
                        if let Err(e) = client.try_subscribe(topic, QoS::AtLeastOnce) {
                            error!("Subscribe to {} failed: {}", topic, e);
                        }
                    }
                }
                Ok(Event::Incoming(Packet::Publish(p))) => {
                    if let Some(status) = device.handle(&p.topic, &p.payload) {
                        publish_status(&client, &status);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT eventloop error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            },
            _ = heartbeat.tick() => {
                debug!(
                    "Heartbeat, schedule enabled={}, AC on={}",
                    device.status().enabled,
                    device.ac_on()
                );
                publish_status(&client, &device.status());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                return;
            }
        }
    }
}

fn publish_status(client: &AsyncClient, status: &device::ScheduleState) {
    let payload = match serde_json::to_vec(status) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to serialize status: {}", e);
            return;
        }
    };
    // try_publish: this task is also the one polling the event loop
    if let Err(e) = client.try_publish(TOPIC_SCHEDULE_STATUS, QoS::AtLeastOnce, false, payload)
    {
        warn!("Failed to publish status: {}", e);
    }
}

async fn post_telemetry(relay_url: String, every: Duration) {
    let http = reqwest::Client::new();
    let url = format!("{}/update", relay_url.trim_end_matches('/'));
    let mut ticker = tokio::time::interval(every);

    loop {
        ticker.tick().await;
        let reading = Telemetry::random(&mut rand::thread_rng());

        match http.post(&url).json(&reading).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Posted {:.1}°C {:.0}%", reading.temperature, reading.humidity);
            }
            Ok(response) => warn!("Relay rejected telemetry: {}", response.status()),
            Err(e) => warn!("Failed to post telemetry: {}", e),
        }
    }
}
