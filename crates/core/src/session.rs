use async_trait::async_trait;

/// System-prompt installation mode for a session: the runner always opens
/// sessions in `Append` mode; the summarizer opens its own session in
/// `Replace` mode since it owns the whole conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemPromptMode {
    Append,
    Replace,
}

/// Assembled by [`crate::ReviewSessionConfigFactory`]-equivalent call sites
/// (the actual factory lives in `quorum-runner`; this is the DTO it
/// produces) and consumed by [`SessionClient::create_session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub system_prompt_mode: SystemPromptMode,
    pub system_prompt: String,
    pub mcp_servers: Option<serde_json::Value>,
    pub reasoning_effort: Option<String>,
}

/// The kind of event an [`EventData`] carries. `AllEvents` subscribers see
/// every kind; the other three streams are filtered views the transport
/// exposes for convenience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Activity,
    Message,
    Idle,
    Error,
}

/// Transport-agnostic event payload. Not every field is meaningful
/// for every `kind` — e.g. `tool_calls` is only populated on `Message`.
#[derive(Debug, Clone, Default)]
pub struct EventData {
    pub kind: Option<EventKind>,
    pub content: Option<String>,
    pub tool_calls: i64,
    pub error_message: Option<String>,
}

pub type EventHandler = Box<dyn Fn(&EventData) + Send + Sync>;

/// A single closeable event subscription. `close` is idempotent and must
/// swallow its own errors at the call site: failures here are
/// logged at `debug`, never propagated.
pub trait Subscription: Send + Sync {
    fn close(&self) -> anyhow::Result<()>;
}

/// One open LLM conversation. The four `on_*` methods are the narrow
/// event-binding surface the core tests against; `send` fires the
/// transport's "send prompt" action — the resulting content arrives through
/// the `on_message` / `on_idle` event stream, not as a return value, which is
/// what lets `ReviewSessionMessageSender` drive the same protocol regardless
/// of whether the underlying transport streams incrementally or replies in
/// one shot — the HTTP-backed client adapts its one-shot call into this shape.
#[async_trait]
pub trait Session: Send + Sync {
    fn on_all_events(&self, handler: EventHandler) -> Box<dyn Subscription>;
    fn on_message(&self, handler: EventHandler) -> Box<dyn Subscription>;
    fn on_idle(&self, handler: EventHandler) -> Box<dyn Subscription>;
    fn on_error(&self, handler: EventHandler) -> Box<dyn Subscription>;

    async fn send(&self, prompt: &str) -> anyhow::Result<()>;
    async fn close(&self) -> anyhow::Result<()>;
}

/// The one surface the core consumes from the LLM transport. One
/// concrete HTTP-backed implementation lives in `quorum-llm`; its wire
/// format is explicitly non-normative.
#[async_trait]
pub trait SessionClient: Send + Sync {
    async fn create_session(&self, config: SessionConfig) -> anyhow::Result<Box<dyn Session>>;
}
