use std::future::Future;
use std::time::Duration;

use quorum_core::ReviewResult;
use tracing::info;

/// Executes an attempt up to `max_retries + 1` times with exponential
/// backoff. Backoff defaults to base 1000ms, max 8000ms. Cancellation
/// is the ambient Tokio kind: if the surrounding task is aborted mid-sleep,
/// the `sleep` future is simply dropped and the loop never resumes — no
/// explicit interrupt-flag bookkeeping is needed (see DESIGN.md Open
/// Question resolution).
#[derive(Debug, Clone, Copy)]
pub struct ReviewRetryExecutor {
    max_retries: u32,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
}

impl ReviewRetryExecutor {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base_ms: 1_000,
            backoff_max_ms: 8_000,
        }
    }

    pub fn with_backoff(max_retries: u32, backoff_base_ms: u64, backoff_max_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
            backoff_max_ms,
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(63);
        let scaled = self.backoff_base_ms.checked_shl(shift).unwrap_or(u64::MAX);
        Duration::from_millis(scaled.min(self.backoff_max_ms))
    }

    /// `attempt` is invoked with the 1-based attempt number and returns
    /// `Err` for a transport-level exception (mapped via `exception_mapper`
    /// into an unsuccessful `ReviewResult`) or `Ok(result)` for a result the
    /// attempt produced on its own (which may itself be unsuccessful).
    pub async fn execute<F, Fut>(
        &self,
        mut attempt: F,
        exception_mapper: impl Fn(anyhow::Error) -> ReviewResult,
    ) -> ReviewResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<ReviewResult>>,
    {
        let total_attempts = self.max_retries + 1;
        let mut last_result = None;

        for attempt_number in 1..=total_attempts {
            let result = match attempt(attempt_number).await {
                Ok(result) => result,
                Err(err) => exception_mapper(err),
            };

            if result.success {
                if attempt_number > 1 {
                    info!(attempt_number, "review succeeded after retry");
                }
                return result;
            }

            if attempt_number < total_attempts {
                tokio::time::sleep(self.backoff_for(attempt_number)).await;
                last_result = Some(result);
                continue;
            }
            return result;
        }

        // Loop always returns on its last iteration; this only fires if
        // `total_attempts == 0`, which cannot happen since `max_retries: u32`
        // makes `total_attempts >= 1`.
        last_result.expect("at least one attempt always runs")
    }
}
