use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use crate::clock::Clock;

/// Errors a [`ContentCollector`] can complete its result with.
#[derive(Debug, Error, Clone)]
pub enum CollectorError {
    #[error("session emitted an error event: {0}")]
    SessionEvent(String),
    #[error("idle timeout: no activity for {elapsed_ms}ms (limit {idle_limit_ms}ms)")]
    IdleTimeout { elapsed_ms: i64, idle_limit_ms: i64 },
}

/// What happened when a caller awaited a collector's result.
#[derive(Debug)]
pub enum AwaitOutcome {
    /// The collector's single-shot future completed (successfully or not)
    /// before the hard timeout elapsed.
    Completed(Result<Option<String>, CollectorError>),
    /// The hard timeout elapsed before the future completed. The caller is
    /// expected to consult [`ContentCollector::accumulated_content`] and
    /// decide whether a partial buffer is an acceptable soft success.
    HardTimedOut,
}

struct Buffer {
    chunks: Vec<String>,
    accumulated_size: usize,
    accumulated_version: u64,
    joined_cache: Option<String>,
    joined_cache_version: u64,
}

impl Buffer {
    fn new() -> Self {
        Self {
            chunks: Vec::new(),
            accumulated_size: 0,
            accumulated_version: 0,
            joined_cache: None,
            joined_cache_version: 0,
        }
    }

    fn joined(&mut self) -> String {
        if self.joined_cache_version == self.accumulated_version {
            if let Some(cached) = &self.joined_cache {
                return cached.clone();
            }
        }
        let joined = self.chunks.concat();
        self.joined_cache = Some(joined.clone());
        self.joined_cache_version = self.accumulated_version;
        joined
    }
}

/// Owned by exactly one session: accumulates streamed message fragments
/// under a memory cap, tracks last-activity time, and yields the final
/// collected content through a single-assignment future.
///
/// Completion happens at most once. The `oneshot::Sender` is wrapped in a
/// `Mutex<Option<_>>` so whichever of `on_idle` / `on_error` /
/// `on_idle_timeout` gets there first takes it; every later caller finds
/// `None` and is a no-op for completion (counters still update).
pub struct ContentCollector {
    max_accumulated_size: usize,
    clock: Arc<dyn Clock>,
    buffer: Mutex<Buffer>,
    last_content: Mutex<Option<String>>,
    last_activity_ms: AtomicI64,
    message_count: AtomicU64,
    tool_call_count: AtomicU64,
    completion: Mutex<Option<oneshot::Sender<Result<Option<String>, CollectorError>>>>,
    result_rx: Mutex<Option<oneshot::Receiver<Result<Option<String>, CollectorError>>>>,
}

impl ContentCollector {
    pub fn new(max_accumulated_size: usize, clock: Arc<dyn Clock>) -> Arc<Self> {
        let (tx, rx) = oneshot::channel();
        let now = clock.now_ms();
        Arc::new(Self {
            max_accumulated_size,
            clock,
            buffer: Mutex::new(Buffer::new()),
            last_content: Mutex::new(None),
            last_activity_ms: AtomicI64::new(now),
            message_count: AtomicU64::new(0),
            tool_call_count: AtomicU64::new(0),
            completion: Mutex::new(Some(tx)),
            result_rx: Mutex::new(Some(rx)),
        })
    }

    /// Called for every event, even ones that carry no payload.
    pub fn on_activity(&self) {
        self.last_activity_ms.store(self.clock.now_ms(), Ordering::SeqCst);
    }

    pub fn on_message(&self, content: &str, tool_calls: i64) {
        self.message_count.fetch_add(1, Ordering::SeqCst);
        self.tool_call_count
            .fetch_add(tool_calls.max(0) as u64, Ordering::SeqCst);

        if content.trim().is_empty() {
            return;
        }

        *self.last_content.lock().unwrap() = Some(content.to_string());

        let mut buf = self.buffer.lock().unwrap();
        if buf.accumulated_size + content.len() <= self.max_accumulated_size {
            buf.chunks.push(content.to_string());
            buf.accumulated_size += content.len();
            buf.accumulated_version += 1;
        }
        // Dropped silently when it would exceed the cap; `last_content` above
        // still reflects it.
    }

    pub fn on_idle(&self) {
        let last = self.last_content.lock().unwrap().clone();
        let value = match last {
            Some(v) if !v.trim().is_empty() => Some(v),
            _ => {
                let joined = self.buffer.lock().unwrap().joined();
                if joined.trim().is_empty() { None } else { Some(joined) }
            }
        };
        self.complete(Ok(value));
    }

    pub fn on_error(&self, message: impl Into<String>) {
        self.complete(Err(CollectorError::SessionEvent(message.into())));
    }

    pub fn on_idle_timeout(&self, elapsed_ms: i64, idle_limit_ms: i64) {
        let joined = self.buffer.lock().unwrap().joined();
        if joined.trim().is_empty() {
            self.complete(Err(CollectorError::IdleTimeout { elapsed_ms, idle_limit_ms }));
        } else {
            self.complete(Ok(Some(joined)));
        }
    }

    fn complete(&self, outcome: Result<Option<String>, CollectorError>) {
        let sender = self.completion.lock().unwrap().take();
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
        // A `None` here means another handler already completed the future;
        // this call is a no-op by design.
    }

    pub fn elapsed_since_last_activity_ms(&self) -> i64 {
        self.clock.now_ms() - self.last_activity_ms.load(Ordering::SeqCst)
    }

    pub fn accumulated_content(&self) -> String {
        self.buffer.lock().unwrap().joined()
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    pub fn tool_call_count(&self) -> u64 {
        self.tool_call_count.load(Ordering::SeqCst)
    }

    pub fn accumulated_size(&self) -> usize {
        self.buffer.lock().unwrap().accumulated_size
    }

    /// Blocks until the collector's future completes or `hard_timeout`
    /// elapses, whichever is first. Can only be meaningfully called once per
    /// collector (the receiver is consumed); later calls report a timeout
    /// immediately since there is nothing left to await.
    pub async fn await_result(&self, hard_timeout: Duration) -> AwaitOutcome {
        let rx = self.result_rx.lock().unwrap().take();
        let Some(rx) = rx else {
            debug!("await_result called more than once on the same collector");
            return AwaitOutcome::HardTimedOut;
        };

        match tokio::time::timeout(hard_timeout, rx).await {
            Ok(Ok(outcome)) => AwaitOutcome::Completed(outcome),
            // Sender dropped without completing — treat as no content.
            Ok(Err(_)) => AwaitOutcome::Completed(Ok(None)),
            Err(_) => AwaitOutcome::HardTimedOut,
        }
    }
}
