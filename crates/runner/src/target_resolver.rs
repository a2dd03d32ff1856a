use quorum_core::{AgentConfig, FileCollector, ReviewContext, ReviewError, ReviewTarget};
use quorum_prompt::AgentPromptBuilder;

/// The `(instruction, local_source_content?, mcp_servers?)` triple the
/// resolver produces for one target.
pub struct ResolvedTarget {
    pub instruction: String,
    pub local_source_content: Option<String>,
    pub mcp_servers: Option<serde_json::Value>,
}

/// Produces the prompt inputs for one target, installing the local source
/// cache into `ctx` on first resolution so later passes and other agents
/// reuse it instead of re-collecting the directory.
pub struct ReviewTargetInstructionResolver;

impl ReviewTargetInstructionResolver {
    pub async fn resolve(
        target: &ReviewTarget,
        agent: &AgentConfig,
        ctx: &ReviewContext,
    ) -> Result<ResolvedTarget, ReviewError> {
        match target {
            ReviewTarget::Remote { repository_id } => {
                let instruction = AgentPromptBuilder::render_instruction(agent, repository_id)?;
                Ok(ResolvedTarget {
                    instruction,
                    local_source_content: None,
                    mcp_servers: ctx.cached_mcp_servers.clone(),
                })
            }
            ReviewTarget::Local { directory } => {
                let repository = target.display_name();
                let instruction = AgentPromptBuilder::render_instruction(agent, &repository)?;

                let directory = directory.clone();
                let collector = ctx.file_collector.clone();
                let local_file_config = ctx.local_file_config.clone();
                let content = ctx
                    .cached_source_content
                    .get_or_try_init(|| async move { Self::collect(&collector, &directory, &local_file_config) })
                    .await
                    .map_err(|err| ReviewError::Configuration(err.to_string()))?;

                Ok(ResolvedTarget {
                    instruction,
                    local_source_content: Some(content.clone()),
                    mcp_servers: None,
                })
            }
        }
    }

    fn collect(
        collector: &dyn FileCollector,
        directory: &std::path::Path,
        _local_file_config: &quorum_core::LocalFileConfig,
    ) -> anyhow::Result<String> {
        collector.collect(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use quorum_collector::SharedScheduler;
    use quorum_core::{SessionClient, SessionConfig};

    struct StubFileCollector {
        calls: Arc<AtomicUsize>,
    }

    impl FileCollector for StubFileCollector {
        fn collect(&self, _directory: &Path) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("fn main() {}".to_string())
        }
    }

    struct StubSessionClient;
    #[async_trait::async_trait]
    impl SessionClient for StubSessionClient {
        async fn create_session(&self, _config: SessionConfig) -> anyhow::Result<Box<dyn quorum_core::Session>> {
            unimplemented!("not exercised in this test")
        }
    }

    fn agent() -> AgentConfig {
        AgentConfig {
            name: "sec".into(),
            system_prompt: "p".into(),
            instruction_template: "Review ${repository}".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn local_target_collects_once_and_reuses_the_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = ReviewContext::new(
            Arc::new(StubSessionClient),
            10,
            5,
            1,
            Arc::new(StubFileCollector { calls: calls.clone() }),
            SharedScheduler::new(),
        )
        .unwrap();

        let target = ReviewTarget::Local { directory: PathBuf::from("/tmp/project") };

        let first = ReviewTargetInstructionResolver::resolve(&target, &agent(), &ctx).await.unwrap();
        let second = ReviewTargetInstructionResolver::resolve(&target, &agent(), &ctx).await.unwrap();

        assert_eq!(first.local_source_content.as_deref(), Some("fn main() {}"));
        assert_eq!(second.local_source_content.as_deref(), Some("fn main() {}"));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "second resolve should reuse the cache");
    }

    #[tokio::test]
    async fn remote_target_carries_cached_mcp_servers_and_no_local_source() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = ReviewContext::new(
            Arc::new(StubSessionClient),
            10,
            5,
            1,
            Arc::new(StubFileCollector { calls }),
            SharedScheduler::new(),
        )
        .unwrap();
        ctx.cached_mcp_servers = Some(serde_json::json!({"github": true}));

        let target = ReviewTarget::Remote { repository_id: "org/repo".to_string() };
        let resolved = ReviewTargetInstructionResolver::resolve(&target, &agent(), &ctx).await.unwrap();

        assert!(resolved.local_source_content.is_none());
        assert_eq!(resolved.mcp_servers, ctx.cached_mcp_servers);
        assert!(resolved.instruction.contains("org/repo"));
    }
}
