use crate::model::ScheduleStatus;

/// How long after an operator command the device's reported value is trusted.
/// Must stay below the device's 60s heartbeat period.
pub const CONFIRMATION_WINDOW_MS: i64 = 30_000;

/// Schedule flag plus the time of the last operator command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleState {
    pub status: ScheduleStatus,
    pub last_command_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEvent {
    OperatorCommand { enabled: bool },
    DeviceReport { enabled: bool },
}

/// What a single event did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Operator set the flag and opened the confirmation window
    Commanded,
    /// Device report inside the window agreed with the current flag
    Confirmed,
    /// Device report inside the window replaced the current flag
    Overridden,
    /// Report outside the window; only liveness was recorded
    Heartbeat,
}

impl ScheduleState {
    pub fn in_confirmation_window(&self, now: i64) -> bool {
        now - self.last_command_at < CONFIRMATION_WINDOW_MS
    }
}

/// Applies one event at `now` and returns the next state.
///
/// Operator commands always win immediately. Device reports are only allowed to
/// change `enabled` while the confirmation window is open; outside it they just
/// refresh `last_update`.
pub fn reconcile(state: ScheduleState, event: ScheduleEvent, now: i64) -> (ScheduleState, Outcome) {
    match event {
        ScheduleEvent::OperatorCommand { enabled } => (
            ScheduleState {
                status: ScheduleStatus {
                    enabled,
                    last_update: now,
                },
                last_command_at: now,
            },
            Outcome::Commanded,
        ),
        ScheduleEvent::DeviceReport { enabled } => {
            // a clock step backwards must not move last_update back
            let last_update = now.max(state.status.last_update);

            if state.in_confirmation_window(now) {
                let outcome = if enabled == state.status.enabled {
                    Outcome::Confirmed
                } else {
                    Outcome::Overridden
                };
                (
                    ScheduleState {
                        status: ScheduleStatus {
                            enabled,
                            last_update,
                        },
                        ..state
                    },
                    outcome,
                )
            } else {
                (
                    ScheduleState {
                        status: ScheduleStatus {
                            last_update,
                            ..state.status
                        },
                        ..state
                    },
                    Outcome::Heartbeat,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(enabled: bool) -> ScheduleEvent {
        ScheduleEvent::OperatorCommand { enabled }
    }

    fn report(enabled: bool) -> ScheduleEvent {
        ScheduleEvent::DeviceReport { enabled }
    }

    #[test]
    fn test_initial_state() {
        let state = ScheduleState::default();
        assert!(state.status.enabled);
        assert_eq!(state.status.last_update, 0);
        assert_eq!(state.last_command_at, 0);
    }

    #[test]
    fn test_command_sets_flag_and_opens_window() {
        let (state, outcome) = reconcile(ScheduleState::default(), command(false), 1_000);

        assert_eq!(outcome, Outcome::Commanded);
        assert!(!state.status.enabled);
        assert_eq!(state.status.last_update, 1_000);
        assert_eq!(state.last_command_at, 1_000);
        assert!(state.in_confirmation_window(1_000));
        assert!(state.in_confirmation_window(30_999));
        assert!(!state.in_confirmation_window(31_000));
    }

    #[test]
    fn test_device_wins_inside_window() {
        let t = 100_000;
        let (state, _) = reconcile(ScheduleState::default(), command(true), t);

        for offset in [0, 1, 15_000, 29_999] {
            let (next, outcome) = reconcile(state, report(false), t + offset);
            assert_eq!(outcome, Outcome::Overridden, "offset {}", offset);
            assert!(!next.status.enabled);
            assert_eq!(next.status.last_update, t + offset);
        }
    }

    #[test]
    fn test_agreeing_report_is_a_confirmation() {
        let (state, _) = reconcile(ScheduleState::default(), command(false), 0);
        let (next, outcome) = reconcile(state, report(false), 2_000);

        assert_eq!(outcome, Outcome::Confirmed);
        assert!(!next.status.enabled);
        assert_eq!(next.status.last_update, 2_000);
    }

    #[test]
    fn test_operator_keeps_value_after_window() {
        let t = 100_000;
        let (state, _) = reconcile(ScheduleState::default(), command(true), t);

        for offset in [30_000, 30_001, 60_000, 3_600_000] {
            let (next, outcome) = reconcile(state, report(false), t + offset);
            assert_eq!(outcome, Outcome::Heartbeat, "offset {}", offset);
            assert!(next.status.enabled);
            assert_eq!(next.status.last_update, t + offset);
            assert_eq!(next.last_command_at, t);
        }
    }

    #[test]
    fn test_heartbeat_without_any_command() {
        // last_command_at = 0 so any realistic clock is far outside the window
        let now = 1_700_000_000_000;
        let (next, outcome) = reconcile(ScheduleState::default(), report(false), now);

        assert_eq!(outcome, Outcome::Heartbeat);
        assert!(next.status.enabled);
        assert_eq!(next.status.last_update, now);
    }

    #[test]
    fn test_confirmation_then_heartbeat_scenario() {
        let (state, _) = reconcile(ScheduleState::default(), command(true), 0);
        assert_eq!(
            state.status,
            ScheduleStatus {
                enabled: true,
                last_update: 0
            }
        );

        let (state, _) = reconcile(state, report(false), 5_000);
        assert_eq!(
            state.status,
            ScheduleStatus {
                enabled: false,
                last_update: 5_000
            }
        );

        let (state, outcome) = reconcile(state, report(false), 65_000);
        assert_eq!(outcome, Outcome::Heartbeat);
        assert_eq!(
            state.status,
            ScheduleStatus {
                enabled: false,
                last_update: 65_000
            }
        );

        // window is closed, so even a disagreeing heartbeat is ignored
        let (state, _) = reconcile(state, report(true), 125_000);
        assert_eq!(
            state.status,
            ScheduleStatus {
                enabled: false,
                last_update: 125_000
            }
        );
    }

    #[test]
    fn test_repeated_command_restarts_window() {
        let (state, _) = reconcile(ScheduleState::default(), command(false), 0);
        let (state, _) = reconcile(state, command(false), 20_000);

        assert!(!state.status.enabled);
        assert_eq!(state.last_command_at, 20_000);

        // 45s after the first command but only 25s after the second
        let (next, outcome) = reconcile(state, report(true), 45_000);
        assert_eq!(outcome, Outcome::Overridden);
        assert!(next.status.enabled);
    }

    #[test]
    fn test_last_update_never_decreases() {
        let mut state = ScheduleState::default();
        let mut previous = state.status.last_update;

        for (i, now) in [10_000, 70_000, 65_000, 130_000, 129_999, 200_000]
            .into_iter()
            .enumerate()
        {
            let (next, _) = reconcile(state, report(i % 2 == 0), now);
            assert!(next.status.last_update >= previous);
            previous = next.status.last_update;
            state = next;
        }
        assert_eq!(state.status.last_update, 200_000);
    }
}
