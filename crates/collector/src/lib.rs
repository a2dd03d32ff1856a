//! Event-driven content collection for one LLM session.
//!
//! This crate owns the "session driver" subsystem: a [`ContentCollector`]
//! accumulates streamed message fragments under a memory cap and yields them
//! through a single-shot future, while a [`SharedScheduler`] periodically
//! checks each collector's idle budget and trips it when exhausted.

mod clock;
mod collector;
mod scheduler;

pub use clock::{Clock, FakeClock, SystemClock};
pub use collector::{AwaitOutcome, CollectorError, ContentCollector};
pub use scheduler::{ScheduledTask, SharedScheduler, MIN_CHECK_INTERVAL_MS};
