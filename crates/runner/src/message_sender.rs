use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use quorum_collector::{AwaitOutcome, Clock, ContentCollector, SharedScheduler};
use quorum_core::{ReviewError, Session};

use crate::events::bind_events;

/// Sends one prompt to one session and returns its collected content, with
/// cleanup on every exit path.
pub struct ReviewSessionMessageSender;

impl ReviewSessionMessageSender {
    /// Arms a collector and idle-timeout check, sends `prompt`, and awaits
    /// up to `hard_timeout`. On hard timeout, returns the accumulated buffer
    /// if it is non-blank (a warned soft success); otherwise propagates
    /// [`ReviewError::HardTimeout`]. Idle-task cancellation and subscription
    /// teardown happen on every exit path, success or failure alike. `clock`
    /// is normally `ReviewContext::clock` (a `SystemClock` in production);
    /// tests inject a `FakeClock` there to drive idle-timeout behavior
    /// without waiting out real minutes.
    pub async fn send_with_activity_timeout(
        session: &dyn Session,
        prompt: &str,
        idle_timeout: Duration,
        hard_timeout: Duration,
        scheduler: &SharedScheduler,
        max_accumulated_size: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Option<String>, ReviewError> {
        let collector = ContentCollector::new(max_accumulated_size, clock);
        let subscriptions = bind_events(session, collector.clone());
        let idle_task = scheduler.schedule_idle_check(collector.clone(), idle_timeout);

        let outcome = async {
            session
                .send(prompt)
                .await
                .map_err(|err| ReviewError::Transport(err.to_string()))?;
            Ok(collector.await_result(hard_timeout).await)
        }
        .await;

        idle_task.cancel();
        subscriptions.close_all();

        match outcome? {
            AwaitOutcome::Completed(Ok(content)) => Ok(content),
            AwaitOutcome::Completed(Err(err)) => Err(err.into()),
            AwaitOutcome::HardTimedOut => {
                let partial = collector.accumulated_content();
                if partial.trim().is_empty() {
                    Err(ReviewError::HardTimeout)
                } else {
                    warn!("hard timeout reached; returning accumulated partial content");
                    Ok(Some(partial))
                }
            }
        }
    }
}
