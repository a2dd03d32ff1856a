use std::future::Future;
use std::pin::Pin;

use quorum_core::ReviewError;
use quorum_prompt::AgentPromptBuilder;

/// Whatever a pass sends a prompt through. Implemented by
/// [`crate::message_sender::ReviewSessionMessageSender`] bound to a live
/// session; stubbed directly in tests.
pub type PromptSender<'a> =
    &'a dyn Fn(String) -> Pin<Box<dyn Future<Output = Result<Option<String>, ReviewError>> + Send + 'a>>;

/// Default response evaluator: non-null and non-blank.
pub fn is_satisfying(response: &Option<String>) -> bool {
    matches!(response, Some(content) if !content.trim().is_empty())
}

/// Orchestrates the prompt-send sequence for one pass. `evaluator`
/// decides whether a response counts as satisfying; the default is
/// [`is_satisfying`].
pub struct ReviewMessageFlow;

/// Prompts used to re-probe a session when it returns nothing useful.
pub struct FollowUpPrompts {
    pub local_review_result_request: String,
    pub follow_up_prompt: String,
}

impl Default for FollowUpPrompts {
    fn default() -> Self {
        Self {
            local_review_result_request: "Please provide the review findings for the source content above.".to_string(),
            follow_up_prompt: "Your previous response was empty. Please provide your review findings now.".to_string(),
        }
    }
}

impl ReviewMessageFlow {
    /// Remote target: send the instruction, and if the response doesn't
    /// satisfy `evaluator`, retry once with the follow-up prompt.
    pub async fn execute_remote(
        sender: PromptSender<'_>,
        instruction: &str,
        prompts: &FollowUpPrompts,
        evaluator: impl Fn(&Option<String>) -> bool,
    ) -> Result<Option<String>, ReviewError> {
        let first = sender(instruction.to_string()).await?;
        if evaluator(&first) {
            return Ok(first);
        }
        sender(prompts.follow_up_prompt.clone()).await
    }

    /// Local target: send the instruction with the source content appended
    /// (when present), escalating through the local-review-result request
    /// and finally the generic follow-up before giving up. `source_content
    /// == None` never sends the local-source header.
    pub async fn execute_local(
        sender: PromptSender<'_>,
        instruction: &str,
        source_content: Option<&str>,
        prompts: &FollowUpPrompts,
        evaluator: impl Fn(&Option<String>) -> bool,
    ) -> Result<Option<String>, ReviewError> {
        let first_prompt = match source_content {
            Some(content) => AgentPromptBuilder::append_local_source(instruction.to_string(), content),
            None => instruction.to_string(),
        };

        let first = sender(first_prompt).await?;
        if evaluator(&first) {
            return Ok(first);
        }

        let second = sender(prompts.local_review_result_request.clone()).await?;
        if evaluator(&second) {
            return Ok(second);
        }

        sender(prompts.follow_up_prompt.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn boxed_sender<'a, F>(f: F) -> impl Fn(String) -> Pin<Box<dyn Future<Output = Result<Option<String>, ReviewError>> + Send + 'a>>
    where
        F: Fn(String) -> Result<Option<String>, ReviewError> + 'a,
    {
        move |prompt| {
            let result = f(prompt);
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn remote_returns_first_satisfying_response() {
        let calls = AtomicUsize::new(0);
        let sender = boxed_sender(|_prompt| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("findings".to_string()))
        });
        let result = ReviewMessageFlow::execute_remote(&sender, "review this", &FollowUpPrompts::default(), is_satisfying)
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("findings"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remote_retries_once_on_empty_response() {
        let calls = AtomicUsize::new(0);
        let sender = boxed_sender(|_prompt| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 { Ok(None) } else { Ok(Some("late findings".to_string())) }
        });
        let result = ReviewMessageFlow::execute_remote(&sender, "review this", &FollowUpPrompts::default(), is_satisfying)
            .await
            .unwrap();
        assert_eq!(result.as_deref(), Some("late findings"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn local_without_source_content_never_sends_the_source_header() {
        let prompts_seen: std::sync::Mutex<Vec<String>> = std::sync::Mutex::new(Vec::new());
        let sender = boxed_sender(|prompt| {
            prompts_seen.lock().unwrap().push(prompt);
            Ok(Some("ok".to_string()))
        });
        ReviewMessageFlow::execute_local(&sender, "review this", None, &FollowUpPrompts::default(), is_satisfying)
            .await
            .unwrap();
        let seen = prompts_seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].contains(quorum_prompt::LOCAL_SOURCE_HEADER));
    }

    #[tokio::test]
    async fn local_escalates_through_both_follow_ups_before_giving_up() {
        let calls = AtomicUsize::new(0);
        let sender = boxed_sender(|_prompt| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });
        let result = ReviewMessageFlow::execute_local(
            &sender,
            "review this",
            Some("fn main() {}"),
            &FollowUpPrompts::default(),
            is_satisfying,
        )
        .await
        .unwrap();
        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
