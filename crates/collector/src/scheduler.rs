use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::collector::ContentCollector;

/// Lower bound on the idle-check period so tiny idle budgets (as used in
/// tests) don't spin the scheduler.
pub const MIN_CHECK_INTERVAL_MS: u64 = 5_000;

/// A handle to one scheduled idle-timeout check. Dropping it does *not*
/// cancel the task — call [`ScheduledTask::cancel`] explicitly, mirroring
/// the "finally" cleanup path in `ReviewSessionMessageSender`.
pub struct ScheduledTask {
    handle: AbortHandle,
}

impl ScheduledTask {
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

/// Single-owned by the orchestrator: periodically asks every registered
/// `ContentCollector` whether its idle budget is exhausted, and trips it if
/// so. Every agent runner submits its own idle check here and is
/// responsible for cancelling it on exit; `shutdown` is a backstop that
/// aborts anything still outstanding.
#[derive(Default)]
pub struct SharedScheduler {
    handles: Mutex<Vec<AbortHandle>>,
}

impl SharedScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Arms a repeating check at period `max(idle_timeout / 4,
    /// MIN_CHECK_INTERVAL_MS)`. Each tick reads the collector's elapsed
    /// idle time and, once it meets or exceeds `idle_timeout`, calls
    /// `on_idle_timeout` exactly once and stops ticking — the collector
    /// itself is idempotent on repeat calls, but there's no reason to keep
    /// polling a session that has already been declared stalled.
    pub fn schedule_idle_check(
        &self,
        collector: Arc<ContentCollector>,
        idle_timeout: Duration,
    ) -> ScheduledTask {
        let period = (idle_timeout / 4).max(Duration::from_millis(MIN_CHECK_INTERVAL_MS));
        let idle_timeout_ms = idle_timeout.as_millis() as i64;

        let join_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick fires immediately; skip it
            loop {
                interval.tick().await;
                let elapsed = collector.elapsed_since_last_activity_ms();
                if elapsed >= idle_timeout_ms {
                    collector.on_idle_timeout(elapsed, idle_timeout_ms);
                    break;
                }
            }
        });

        let handle = join_handle.abort_handle();
        self.handles.lock().unwrap().push(handle.clone());
        ScheduledTask { handle }
    }

    /// Aborts every idle check ever scheduled on this instance. Intended for
    /// orchestrator shutdown; individual agent runners should still cancel
    /// their own task as soon as their session finishes.
    pub fn shutdown(&self) {
        for handle in self.handles.lock().unwrap().drain(..) {
            handle.abort();
        }
    }
}
