use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const TOPIC_AC_CONTROL: &str = "office/ac/control";
pub const TOPIC_SCHEDULE_ENABLED: &str = "office/ac/schedule/enabled";
pub const TOPIC_SCHEDULE_STATUS: &str = "office/ac/schedule/status";

#[derive(Debug, Serialize, Deserialize)]
struct AcCommand {
    action: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleState {
    pub enabled: bool,
}

/// Schedule and AC state of the emulated office device
#[derive(Debug)]
pub struct Device {
    schedule_enabled: bool,
    ac_on: bool,
    drop_commands: bool,
}

impl Device {
    pub fn new(drop_commands: bool) -> Self {
        Self {
            schedule_enabled: true,
            ac_on: false,
            drop_commands,
        }
    }

    pub fn status(&self) -> ScheduleState {
        ScheduleState {
            enabled: self.schedule_enabled,
        }
    }

    /// Applies a command and returns the status to publish back, if any
    pub fn handle(&mut self, topic: &str, payload: &[u8]) -> Option<ScheduleState> {
        match topic {
            TOPIC_AC_CONTROL => {
                match serde_json::from_slice::<AcCommand>(payload) {
                    Ok(cmd) if cmd.action == "on" || cmd.action == "off" => {
                        self.ac_on = cmd.action == "on";
                        info!("AC switched {}", cmd.action);
                    }
                    Ok(cmd) => warn!("Unknown AC action {}", cmd.action),
                    Err(e) => warn!("Bad AC command: {}", e),
                }
                None
            }
            TOPIC_SCHEDULE_ENABLED => {
                let cmd = match serde_json::from_slice::<ScheduleState>(payload) {
                    Ok(cmd) => cmd,
                    Err(e) => {
                        warn!("Bad schedule command: {}", e);
                        return None;
                    }
                };
                if self.drop_commands {
                    info!("Ignoring schedule command enabled={}", cmd.enabled);
                    return None;
                }
                self.schedule_enabled = cmd.enabled;
                info!("Schedule {}", if cmd.enabled { "enabled" } else { "disabled" });
                Some(self.status())
            }
            _ => None,
        }
    }

    pub fn ac_on(&self) -> bool {
        self.ac_on
    }
}
