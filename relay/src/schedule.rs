use crate::channel::{publish_json, Publisher};
use crate::clock::Clock;
use crate::metrics::{CONFIRMATIONS_TOTAL, DEVICE_REPORTS_TOTAL};
use crate::model::{DeviceReport, ScheduleCommand, ScheduleStatus};
use crate::reconcile::{reconcile, Outcome, ScheduleEvent, ScheduleState};
use crate::topics::TOPIC_SCHEDULE_ENABLED;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Single owner of the schedule flag.
///
/// Every mutation runs `reconcile` under one lock so `enabled`, `last_update`
/// and the command time always move together.
pub struct ScheduleController {
    state: Mutex<ScheduleState>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn Publisher>,
}

impl ScheduleController {
    pub fn new(clock: Arc<dyn Clock>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            state: Mutex::new(ScheduleState::default()),
            clock,
            publisher,
        }
    }

    /// Operator command: set the flag optimistically, then tell the device.
    ///
    /// The publish happens under the state lock so concurrent commands reach
    /// the device in the same order they were applied. `Publisher::publish`
    /// never blocks.
    pub fn set_schedule(&self, enabled: bool) -> ScheduleStatus {
        let mut state = self.state.lock();
        let (next, _) = reconcile(
            *state,
            ScheduleEvent::OperatorCommand { enabled },
            self.clock.now_ms(),
        );
        *state = next;
        publish_json(
            self.publisher.as_ref(),
            TOPIC_SCHEDULE_ENABLED,
            &ScheduleCommand { enabled },
        );
        drop(state);

        let status = next.status;
        info!("Schedule {} by operator", if enabled { "enabled" } else { "disabled" });
        status
    }

    pub fn on_device_report(&self, report: DeviceReport) -> Outcome {
        DEVICE_REPORTS_TOTAL.inc();
        let (status, outcome) = self.apply(ScheduleEvent::DeviceReport {
            enabled: report.enabled,
        });

        match outcome {
            Outcome::Confirmed | Outcome::Overridden => {
                CONFIRMATIONS_TOTAL.inc();
                info!(
                    "Device confirmed schedule state: enabled={} ({:?})",
                    status.enabled, outcome
                );
            }
            _ => debug!(
                "Device heartbeat (reported enabled={}), keeping enabled={}",
                report.enabled, status.enabled
            ),
        }
        outcome
    }

    pub fn snapshot(&self) -> ScheduleStatus {
        self.state.lock().status
    }

    fn apply(&self, event: ScheduleEvent) -> (ScheduleStatus, Outcome) {
        // commands go through set_schedule, which also publishes under the lock
        let mut state = self.state.lock();
        let now = self.clock.now_ms();
        let (next, outcome) = reconcile(*state, event, now);
        *state = next;
        (next.status, outcome)
    }
}

/// Drains device reports into the controller until the channel closes.
pub async fn run_reconciler(
    mut rx: mpsc::Receiver<DeviceReport>,
    controller: Arc<ScheduleController>,
) {
    info!("Starting schedule reconciler");

    while let Some(report) = rx.recv().await {
        controller.on_device_report(report);
    }

    info!("Report channel closed, reconciler stopped");
}
