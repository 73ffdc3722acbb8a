use serde::{Deserialize, Serialize};

/// Latest temperature/humidity reading pushed by the office device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub temperature: f64,
    pub humidity: f64,
    /// Epoch milliseconds when the relay accepted the reading
    pub timestamp: i64,
}

/// Reconciled schedule flag as seen by operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    pub enabled: bool,
    pub last_update: i64,
}

impl Default for ScheduleStatus {
    fn default() -> Self {
        Self {
            enabled: true,
            last_update: 0,
        }
    }
}

/// Schedule state reported by the device on the status topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceReport {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcAction {
    On,
    Off,
}

impl AcAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcAction::On => "on",
            AcAction::Off => "off",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Deserialize)]
pub struct AcRequest {
    pub action: AcAction,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Payload published on the AC control topic
#[derive(Debug, Serialize)]
pub struct AcCommand {
    pub action: AcAction,
}

/// Payload published on the schedule command topic
#[derive(Debug, Serialize)]
pub struct ScheduleCommand {
    pub enabled: bool,
}

/// `{status, message}` envelope returned by the write endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    pub fn success() -> Self {
        Self {
            status: "success",
            message: None,
        }
    }

    pub fn success_with(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthView {
    pub online: bool,
    pub schedule_fresh: bool,
}
