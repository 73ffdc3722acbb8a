pub const TOPIC_AC_CONTROL: &str = "office/ac/control";
pub const TOPIC_SCHEDULE_ENABLED: &str = "office/ac/schedule/enabled";
pub const TOPIC_SCHEDULE_STATUS: &str = "office/ac/schedule/status";
