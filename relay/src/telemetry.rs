use crate::clock::Clock;
use crate::metrics::TELEMETRY_UPDATES_TOTAL;
use crate::model::TelemetryReading;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Holds the most recent reading only; there is no history.
pub struct TelemetryStore {
    latest: RwLock<TelemetryReading>,
    clock: Arc<dyn Clock>,
}

impl TelemetryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            latest: RwLock::new(TelemetryReading::default()),
            clock,
        }
    }

    pub fn record(&self, temperature: f64, humidity: f64) -> TelemetryReading {
        let reading = TelemetryReading {
            temperature,
            humidity,
            timestamp: self.clock.now_ms(),
        };
        *self.latest.write() = reading;
        TELEMETRY_UPDATES_TOTAL.inc();
        debug!(
            "Telemetry recorded: {:.1}°C, {:.1}%",
            reading.temperature, reading.humidity
        );
        reading
    }

    pub fn snapshot(&self) -> TelemetryReading {
        *self.latest.read()
    }
}
