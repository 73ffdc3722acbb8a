//! Runs against a live relay and broker:
//!
//!     cargo run -p relay &
//!     cargo test -p relay --test end_to_end -- --ignored
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

fn relay_url() -> String {
    env::var("RELAY_URL").unwrap_or_else(|_| "http://127.0.0.1:3789".to_string())
}

/// Connects a fake device and returns its client plus a stream of commands it receives
async fn fake_device(name: &str) -> (AsyncClient, mpsc::UnboundedReceiver<(String, Value)>) {
    let broker = env::var("MQTT_BROKER").unwrap_or_else(|_| "localhost".to_string());
    let mut mqtt_options = MqttOptions::new(name, broker, 1883);
    mqtt_options.set_keep_alive(Duration::from_secs(30));

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);
    client
        .subscribe("office/ac/#", QoS::AtLeastOnce)
        .await
        .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(p))) => {
                    let payload = serde_json::from_slice(&p.payload).unwrap_or(Value::Null);
                    if tx.send((p.topic, payload)).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("MQTT error: {}", e);
                    break;
                }
            }
        }
    });

    sleep(Duration::from_millis(500)).await;
    (client, rx)
}

async fn next_on(rx: &mut mpsc::UnboundedReceiver<(String, Value)>, topic: &str) -> Value {
    timeout(Duration::from_secs(5), async {
        loop {
            let (t, payload) = rx.recv().await.expect("device stream ended");
            if t == topic {
                return payload;
            }
        }
    })
    .await
    .expect("no message on topic")
}

#[tokio::test]
#[ignore]
async fn test_telemetry_round_trip() {
    let http = reqwest::Client::new();

    let body: Value = http
        .post(format!("{}/update", relay_url()))
        .body(r#"{"temperature": 18.5, "humidity": 44.0}"#)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"status": "success"}));

    let data: Value = http
        .get(format!("{}/api/data", relay_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(data["temperature"], 18.5);
    assert_eq!(data["humidity"], 44.0);
}

#[tokio::test]
#[ignore]
async fn test_schedule_command_and_confirmation() {
    let (device, mut commands) = fake_device("e2e-device").await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/schedule", relay_url()))
        .json(&json!({"enabled": false}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let command = next_on(&mut commands, "office/ac/schedule/enabled").await;
    assert_eq!(command, json!({"enabled": false}));

    // device disagrees inside the window, so the relay must follow it
    device
        .publish(
            "office/ac/schedule/status",
            QoS::AtLeastOnce,
            false,
            r#"{"enabled":true}"#,
        )
        .await
        .unwrap();
    sleep(Duration::from_millis(500)).await;

    let status: Value = http
        .get(format!("{}/api/status", relay_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["enabled"], true);
}

#[tokio::test]
#[ignore]
async fn test_ac_command_reaches_device() {
    let (_device, mut commands) = fake_device("e2e-device-ac").await;

    reqwest::Client::new()
        .post(format!("{}/ac", relay_url()))
        .json(&json!({"action": "off"}))
        .send()
        .await
        .unwrap();

    let command = next_on(&mut commands, "office/ac/control").await;
    assert_eq!(command, json!({"action": "off"}));
}
