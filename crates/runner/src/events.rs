use std::sync::Arc;

use tracing::debug;

use quorum_collector::ContentCollector;
use quorum_core::{EventData, EventKind, Session, Subscription};

/// Owns the four subscriptions a pass registers on one session.
/// `close_all` closes every stream and swallows per-subscription errors at
/// `debug` — subscription teardown is never allowed to fail a pass.
pub struct EventSubscriptions {
    all_events: Box<dyn Subscription>,
    message: Box<dyn Subscription>,
    idle: Box<dyn Subscription>,
    error: Box<dyn Subscription>,
}

impl EventSubscriptions {
    pub fn close_all(&self) {
        for (name, sub) in [
            ("all-events", &self.all_events),
            ("message", &self.message),
            ("idle", &self.idle),
            ("error", &self.error),
        ] {
            if let Err(err) = sub.close() {
                debug!(stream = name, %err, "subscription close failed, ignoring");
            }
        }
    }
}

/// Binds a fresh [`ContentCollector`] to `session`'s four event streams:
/// `all-events → on_activity`, `message → on_message`, `idle → on_idle`,
/// `error → on_error`. This is the narrow, transport-agnostic surface the
/// core tests against — it never names a concrete transport type.
pub fn bind_events(session: &dyn Session, collector: Arc<ContentCollector>) -> EventSubscriptions {
    let all_events = {
        let collector = collector.clone();
        session.on_all_events(Box::new(move |_event: &EventData| {
            collector.on_activity();
        }))
    };

    let message = {
        let collector = collector.clone();
        session.on_message(Box::new(move |event: &EventData| {
            let content = event.content.as_deref().unwrap_or("");
            collector.on_message(content, event.tool_calls);
        }))
    };

    let idle = {
        let collector = collector.clone();
        session.on_idle(Box::new(move |_event: &EventData| {
            collector.on_idle();
        }))
    };

    let error = {
        let collector = collector.clone();
        session.on_error(Box::new(move |event: &EventData| {
            let message = event.error_message.clone().unwrap_or_else(|| "unknown session error".to_string());
            collector.on_error(message);
        }))
    };

    EventSubscriptions { all_events, message, idle, error }
}
