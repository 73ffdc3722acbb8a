use crate::channel::{publish_json, Publisher};
use crate::model::{AcAction, AcCommand};
use crate::topics::TOPIC_AC_CONTROL;
use tracing::info;

/// Forwards a manual AC command to the device. Holds no state.
pub fn send_ac_command(publisher: &dyn Publisher, action: AcAction) {
    publish_json(publisher, TOPIC_AC_CONTROL, &AcCommand { action });
    info!("AC control sent: {}", action.as_str());
}
