use crate::errors::Result;
use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref TELEMETRY_UPDATES_TOTAL: Counter = counter(
        "relay_telemetry_updates_total",
        "Total telemetry readings accepted on /update"
    );
    pub static ref DEVICE_REPORTS_TOTAL: Counter = counter(
        "relay_device_reports_total",
        "Total schedule status reports received from the device"
    );
    pub static ref CONFIRMATIONS_TOTAL: Counter = counter(
        "relay_confirmations_total",
        "Device reports that landed inside the confirmation window"
    );
    pub static ref INVALID_REPORTS_TOTAL: Counter = counter(
        "relay_invalid_reports_total",
        "Total malformed device reports dropped"
    );
    pub static ref COMMANDS_PUBLISHED_TOTAL: Counter = counter(
        "relay_commands_published_total",
        "Total commands handed to the MQTT client"
    );
    pub static ref PUBLISH_FAILURES_TOTAL: Counter = counter(
        "relay_publish_failures_total",
        "Total commands the MQTT client refused"
    );
}

fn counter(name: &str, help: &str) -> Counter {
    // name and help are static literals, so construction cannot fail
    Counter::with_opts(Opts::new(name, help))
        .unwrap_or_else(|e| panic!("invalid metric {}: {}", name, e))
}

pub fn init_metrics() -> Result<()> {
    REGISTRY.register(Box::new(TELEMETRY_UPDATES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEVICE_REPORTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFIRMATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVALID_REPORTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMMANDS_PUBLISHED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PUBLISH_FAILURES_TOTAL.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
