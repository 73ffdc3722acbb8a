use crate::model::{ScheduleStatus, TelemetryReading};

/// A reading older than this means the device is offline.
pub const ONLINE_THRESHOLD_MS: i64 = 90_000;
/// A schedule status older than this is not trusted by the dashboard.
pub const FRESH_THRESHOLD_MS: i64 = 60_000;

pub fn is_online(reading: &TelemetryReading, now: i64) -> bool {
    now - reading.timestamp < ONLINE_THRESHOLD_MS
}

pub fn is_fresh(status: &ScheduleStatus, now: i64) -> bool {
    now - status.last_update < FRESH_THRESHOLD_MS
}
