use quorum_core::{AgentConfig, SessionConfig, SystemPromptMode};

/// Resolves whether a model supports a reasoning-effort parameter, and at
/// what default level. Keyed by a case-insensitive prefix match since model
/// ids are frequently versioned (`gpt-5`, `gpt-5-mini`, `gpt-5.1-codex`).
fn resolve_reasoning_effort(model: &str, requested: Option<&str>) -> Option<String> {
    const REASONING_MODEL_PREFIXES: &[&str] = &["gpt-5", "o3", "o4"];
    let model_lower = model.to_lowercase();
    let supported = REASONING_MODEL_PREFIXES.iter().any(|prefix| model_lower.starts_with(prefix));
    if !supported {
        return None;
    }
    Some(requested.unwrap_or("medium").to_string())
}

/// Assembles the [`SessionConfig`] the `SessionClient` consumes.
pub struct ReviewSessionConfigFactory;

impl ReviewSessionConfigFactory {
    pub fn create(
        agent: &AgentConfig,
        system_prompt: String,
        mcp_servers: Option<serde_json::Value>,
        reasoning_effort: Option<&str>,
    ) -> SessionConfig {
        SessionConfig {
            model: agent.model.clone(),
            system_prompt_mode: SystemPromptMode::Append,
            system_prompt,
            mcp_servers,
            reasoning_effort: resolve_reasoning_effort(&agent.model, reasoning_effort),
        }
    }
}
