use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use quorum_core::{EventData, EventHandler, Session, SessionClient, SessionConfig, Subscription};

/// One scripted turn a [`InMemorySessionClient`]-backed session plays back
/// on its next `send`. Scripts are consumed front-to-back, one per `send`
/// call, which is exactly how many times `ReviewMessageFlow` calls through
/// a single pass (primary send, then up to two follow-ups).
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Fires a `Message` event with this content, then `Idle`.
    Reply(String),
    /// Fires `Idle` with no preceding message — an empty response.
    Empty,
    /// Fires an `Error` event.
    Error(String),
    /// Fires nothing at all. Used to drive a caller's idle- or
    /// hard-timeout path; the scheduler (or test harness) is responsible
    /// for tripping the timeout.
    Silent,
    /// Fires one `Message` event per entry, in order, then nothing further
    /// — no `Idle`. Simulates a model that streams content in pieces and
    /// then goes quiet mid-turn; the idle-timeout scheduler, not the
    /// session, is what ends up completing the call.
    PartialMessages(Vec<String>),
}

struct NoopSubscription;
impl Subscription for NoopSubscription {
    fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct ScriptedSession {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    message_handler: Mutex<Option<EventHandler>>,
    idle_handler: Mutex<Option<EventHandler>>,
    error_handler: Mutex<Option<EventHandler>>,
}

impl ScriptedSession {
    fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            message_handler: Mutex::new(None),
            idle_handler: Mutex::new(None),
            error_handler: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    fn on_all_events(&self, _handler: EventHandler) -> Box<dyn Subscription> {
        Box::new(NoopSubscription)
    }

    fn on_message(&self, handler: EventHandler) -> Box<dyn Subscription> {
        *self.message_handler.lock().unwrap() = Some(handler);
        Box::new(NoopSubscription)
    }

    fn on_idle(&self, handler: EventHandler) -> Box<dyn Subscription> {
        *self.idle_handler.lock().unwrap() = Some(handler);
        Box::new(NoopSubscription)
    }

    fn on_error(&self, handler: EventHandler) -> Box<dyn Subscription> {
        *self.error_handler.lock().unwrap() = Some(handler);
        Box::new(NoopSubscription)
    }

    async fn send(&self, _prompt: &str) -> anyhow::Result<()> {
        let turn = self.turns.lock().unwrap().pop_front();
        match turn {
            Some(ScriptedTurn::Reply(content)) => {
                if let Some(handler) = self.message_handler.lock().unwrap().as_ref() {
                    handler(&EventData { content: Some(content), ..Default::default() });
                }
                if let Some(handler) = self.idle_handler.lock().unwrap().as_ref() {
                    handler(&EventData::default());
                }
            }
            Some(ScriptedTurn::Empty) | None => {
                if let Some(handler) = self.idle_handler.lock().unwrap().as_ref() {
                    handler(&EventData::default());
                }
            }
            Some(ScriptedTurn::Error(message)) => {
                if let Some(handler) = self.error_handler.lock().unwrap().as_ref() {
                    handler(&EventData { error_message: Some(message), ..Default::default() });
                }
            }
            Some(ScriptedTurn::Silent) => {}
            Some(ScriptedTurn::PartialMessages(pieces)) => {
                for piece in pieces {
                    if let Some(handler) = self.message_handler.lock().unwrap().as_ref() {
                        handler(&EventData { content: Some(piece), ..Default::default() });
                    }
                }
            }
        }
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A [`SessionClient`] test double scripted by model id: each
/// [`InMemorySessionClient::script`] call enqueues one session's worth of
/// turns for that model, popped in FIFO order on successive
/// `create_session` calls carrying the same model. Keying by model rather
/// than call order lets tests script several agents (each given a distinct
/// `model`) independently even though the orchestrator runs them
/// concurrently.
#[derive(Default)]
pub struct InMemorySessionClient {
    scripts: Mutex<HashMap<String, VecDeque<Vec<ScriptedTurn>>>>,
}

impl InMemorySessionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues one session's worth of turns for `model`. Call once per
    /// pass the test expects that model to open a session for.
    pub fn script(&self, model: impl Into<String>, turns: Vec<ScriptedTurn>) {
        self.scripts.lock().unwrap().entry(model.into()).or_default().push_back(turns);
    }
}

#[async_trait]
impl SessionClient for InMemorySessionClient {
    async fn create_session(&self, config: SessionConfig) -> anyhow::Result<Box<dyn Session>> {
        let turns = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&config.model)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default();
        Ok(Box::new(ScriptedSession::new(turns)))
    }
}
