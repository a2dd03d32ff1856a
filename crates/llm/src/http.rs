use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use quorum_core::{EventData, EventHandler, EventKind, Session, SessionClient, SessionConfig, Subscription};

/// A subscription over an in-process event stream; closing it just drops
/// the stored handler so no further events can be delivered.
struct HandlerSubscription {
    handler: Mutex<Option<EventHandler>>,
}

impl Subscription for HandlerSubscription {
    fn close(&self) -> anyhow::Result<()> {
        *self.handler.lock().unwrap() = None;
        Ok(())
    }
}

fn fire(handler: &Mutex<Option<EventHandler>>, event: &EventData) {
    if let Some(handler) = handler.lock().unwrap().as_ref() {
        handler(event);
    }
}

/// One OpenAI-compatible chat session backed by `reqwest`. `send` fires
/// `Activity` when the request is issued, then awaits the HTTP call inline
/// and replays its outcome onto `Message`/`Error`, then `Idle`, once the
/// call settles. The underlying `reqwest::Client` is built with a
/// request-level timeout (see [`HttpSessionClient::with_request_timeout`])
/// so a stalled transport cannot hang `send()` forever and defeat the
/// orchestration core's hard-timeout invariant — `send()` is awaited
/// directly by `ReviewSessionMessageSender` before it ever reaches the
/// timeout-bounded `await_result` call, so the bound has to live here, at
/// the HTTP layer, rather than around the event-driven completion path.
/// This wire format is not certified; it exists so the crate runs end to
/// end against a real transport.
pub struct HttpSession {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    config: SessionConfig,
    all_events: Mutex<Option<EventHandler>>,
    message: Mutex<Option<EventHandler>>,
    idle: Mutex<Option<EventHandler>>,
    error: Mutex<Option<EventHandler>>,
}

#[async_trait]
impl Session for HttpSession {
    fn on_all_events(&self, handler: EventHandler) -> Box<dyn Subscription> {
        *self.all_events.lock().unwrap() = Some(handler);
        Box::new(HandlerSubscription { handler: Mutex::new(None) })
    }

    fn on_message(&self, handler: EventHandler) -> Box<dyn Subscription> {
        *self.message.lock().unwrap() = Some(handler);
        Box::new(HandlerSubscription { handler: Mutex::new(None) })
    }

    fn on_idle(&self, handler: EventHandler) -> Box<dyn Subscription> {
        *self.idle.lock().unwrap() = Some(handler);
        Box::new(HandlerSubscription { handler: Mutex::new(None) })
    }

    fn on_error(&self, handler: EventHandler) -> Box<dyn Subscription> {
        *self.error.lock().unwrap() = Some(handler);
        Box::new(HandlerSubscription { handler: Mutex::new(None) })
    }

    async fn send(&self, prompt: &str) -> anyhow::Result<()> {
        fire(&self.all_events, &EventData { kind: Some(EventKind::Activity), ..Default::default() });

        let payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": self.config.system_prompt},
                {"role": "user", "content": prompt},
            ],
            "stream": false,
        });

        let endpoint = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let mut request = self.client.post(endpoint).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await;

        match response {
            Ok(response) if response.status().is_success() => {
                let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
                let content = body
                    .get("choices")
                    .and_then(|choices| choices.get(0))
                    .and_then(|choice| choice.get("message"))
                    .and_then(|message| message.get("content"))
                    .and_then(|content| content.as_str())
                    .unwrap_or("")
                    .to_string();
                fire(&self.message, &EventData { content: Some(content), ..Default::default() });
                fire(&self.idle, &EventData::default());
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                fire(&self.error, &EventData { error_message: Some(format!("HTTP {status}: {body}")), ..Default::default() });
            }
            Err(err) => {
                fire(&self.error, &EventData { error_message: Some(err.to_string()), ..Default::default() });
            }
        }

        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// The fallback request timeout used by [`HttpSessionClient::new`] when the
/// caller doesn't have a more specific bound (e.g. a pass's configured hard
/// timeout) in hand yet. Matches `OrchestrationConfig::timeout_minutes`'s
/// own default of 10 minutes.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Creates [`HttpSession`]s against a single OpenAI-compatible base URL.
/// Remote-tool configuration and reasoning effort from [`SessionConfig`] are
/// accepted but not forwarded to the wire payload — this client exists to
/// make the workspace runnable end to end, not as a feature-complete
/// provider integration. The optional bearer token is the transport-level
/// access credential for that base URL; the orchestration core never sees
/// it, since it lives below the `SessionClient` seam.
pub struct HttpSessionClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSessionClient {
    /// Builds a client with the default request timeout. Callers that know
    /// the orchestration's configured hard timeout (the CLI does, from
    /// `OrchestrationConfig::timeout_minutes`) should prefer
    /// [`Self::with_request_timeout`] so the HTTP-layer bound matches the
    /// pass-level one instead of drifting from it.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_request_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Builds a client whose every `send()` call is bounded by
    /// `request_timeout` at the `reqwest` layer. This is what keeps a
    /// stalled remote server from hanging `send()` past the pass's hard
    /// timeout — `reqwest::Client`'s own timeout aborts the in-flight
    /// request and `send()` returns an error, which this session turns into
    /// an `Error` event rather than blocking forever.
    pub fn with_request_timeout(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("reqwest client configuration (timeout only) is always valid");
        Self {
            client,
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn create_session(&self, config: SessionConfig) -> anyhow::Result<Box<dyn Session>> {
        debug!(model = %config.model, "opening http session");
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            config,
            all_events: Mutex::new(None),
            message: Mutex::new(None),
            idle: Mutex::new(None),
            error: Mutex::new(None),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::SystemPromptMode;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> SessionConfig {
        SessionConfig {
            model: "gpt-5".to_string(),
            system_prompt_mode: SystemPromptMode::Append,
            system_prompt: "You are a reviewer.".to_string(),
            mcp_servers: None,
            reasoning_effort: None,
        }
    }

    #[tokio::test]
    async fn successful_response_fires_message_then_idle() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "### 1. Finding"}}]
            })))
            .mount(&server)
            .await;

        let client = HttpSessionClient::new(server.uri());
        let session = client.create_session(config()).await.unwrap();

        let received = Arc::new(std::sync::Mutex::new(None));
        let received_clone = received.clone();
        session.on_message(Box::new(move |event| {
            *received_clone.lock().unwrap() = event.content.clone();
        }));
        let went_idle = Arc::new(AtomicBool::new(false));
        let went_idle_clone = went_idle.clone();
        session.on_idle(Box::new(move |_| {
            went_idle_clone.store(true, Ordering::SeqCst);
        }));

        session.send("review this").await.unwrap();

        assert_eq!(received.lock().unwrap().as_deref(), Some("### 1. Finding"));
        assert!(went_idle.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn token_is_sent_as_a_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "### 1. Finding"}}]
            })))
            .mount(&server)
            .await;

        let client = HttpSessionClient::new(server.uri()).with_token("secret-token");
        let session = client.create_session(config()).await.unwrap();

        let error_message = Arc::new(std::sync::Mutex::new(None));
        let error_message_clone = error_message.clone();
        session.on_error(Box::new(move |event| {
            *error_message_clone.lock().unwrap() = event.error_message.clone();
        }));

        session.send("review this").await.unwrap();

        assert!(error_message.lock().unwrap().is_none(), "wiremock would reject a missing/wrong bearer header");
    }

    #[tokio::test]
    async fn http_error_fires_the_error_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = HttpSessionClient::new(server.uri());
        let session = client.create_session(config()).await.unwrap();

        let error_message = Arc::new(std::sync::Mutex::new(None));
        let error_message_clone = error_message.clone();
        session.on_error(Box::new(move |event| {
            *error_message_clone.lock().unwrap() = event.error_message.clone();
        }));

        session.send("review this").await.unwrap();

        let message = error_message.lock().unwrap();
        assert!(message.as_ref().unwrap().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn a_stalled_server_times_out_at_the_http_layer_instead_of_hanging_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
            .mount(&server)
            .await;

        let client = HttpSessionClient::with_request_timeout(server.uri(), Duration::from_millis(20));
        let session = client.create_session(config()).await.unwrap();

        let error_message = Arc::new(std::sync::Mutex::new(None));
        let error_message_clone = error_message.clone();
        session.on_error(Box::new(move |event| {
            *error_message_clone.lock().unwrap() = event.error_message.clone();
        }));

        let started = std::time::Instant::now();
        session.send("review this").await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(200), "send() should return once reqwest's own timeout fires, not wait out the full server delay");
        assert!(error_message.lock().unwrap().is_some(), "a timed-out request should fire the error stream");
    }
}
