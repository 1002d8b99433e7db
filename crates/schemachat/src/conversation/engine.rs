//! Conversation engine: one model call per turn.
//!
//! The full history is resent on every call with the system prompt in
//! front of it. The prompt is never stored in the history itself.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conversation::backend::{ChatBackend, ChatMessage};
use crate::conversation::reply_parser::parse_reply;
use crate::message::{Conversation, Message, MessageTag};
use crate::metrics;
use crate::project_db::SchemaPayload;
use crate::utils::TextUtils;

pub const SYSTEM_PROMPT: &str = "You are a database designer. Generate SQL Schemas based on user requirements.

Process:
First Response: Generate SQL schema right away.
Follow-up Questions (Direct & Concise):
-Does this look good?
-Want to modify any schema?
-Need to add more features?
-Want to change any relationships?


SQL format:
CREATE TABLE table_name (
  column_name data_type constraints,
  ...
);

No explanations, just produce the result.
Keep responses short and direct.
Continue asking relevant questions and wait for user input.
Maintain a natural conversational tone (e.g., \"Got it, let's start with...\").";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("language model returned an empty response")]
    EmptyResponse,
    #[error("language model call failed: {0}")]
    Backend(#[from] anyhow::Error),
}

/// The assistant side of one turn.
///
/// `content` is the verbatim model output and is what gets appended to the
/// history, so later calls and re-renders see exactly what the model said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub content: String,
    pub schema: SchemaPayload,
    pub text: String,
}

impl AssistantReply {
    pub fn from_output(content: String) -> Self {
        let parsed = parse_reply(&content);
        Self {
            content,
            schema: parsed.schema,
            text: parsed.text,
        }
    }

    pub fn tag(&self) -> MessageTag {
        if self.schema.is_empty() {
            MessageTag::Question
        } else {
            MessageTag::Response
        }
    }

    pub fn to_message(&self) -> Message {
        Message::assistant(self.content.clone(), Some(self.tag()))
    }
}

#[derive(Clone)]
pub struct ConversationEngine {
    backend: Arc<dyn ChatBackend>,
}

impl ConversationEngine {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    /// System prompt followed by every message in the history
    pub fn build_request(history: &Conversation) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::new("system", SYSTEM_PROMPT))
            .chain(
                history
                    .messages()
                    .iter()
                    .map(|m| ChatMessage::new(m.role.as_str(), m.content.clone())),
            )
            .collect()
    }

    /// Produce the next assistant turn for `history`. No retries.
    pub async fn respond(&self, history: &Conversation) -> Result<AssistantReply, EngineError> {
        let request = Self::build_request(history);
        debug!("Sending {} history messages to the model", history.len());

        let started = Instant::now();
        let outcome = self.backend.complete(&request).await;
        metrics::observe_llm_latency(started.elapsed().as_secs_f64());

        let output = match outcome {
            Ok(Some(output)) if !output.trim().is_empty() => output,
            Ok(_) => {
                metrics::inc_llm_request("empty");
                warn!("Model returned no content");
                return Err(EngineError::EmptyResponse);
            }
            Err(e) => {
                metrics::inc_llm_request("error");
                return Err(EngineError::Backend(e));
            }
        };
        metrics::inc_llm_request("ok");

        let reply = AssistantReply::from_output(output);
        info!(
            "Model reply: schema={} text='{}'",
            !reply.schema.is_empty(),
            TextUtils::preview(&reply.text, 80)
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use proptest::prelude::*;

    fn history() -> Conversation {
        Conversation::default()
            .with_message(Message::user("I need a blog"))
            .with_message(Message::assistant("Which entities?", Some(MessageTag::Question)))
            .with_message(Message::user("posts and users"))
    }

    #[test]
    fn test_request_prepends_system_prompt_and_drops_tags() {
        let request = ConversationEngine::build_request(&history());
        assert_eq!(request.len(), 4);
        assert_eq!(request[0], ChatMessage::new("system", SYSTEM_PROMPT));
        assert_eq!(request[2], ChatMessage::new("assistant", "Which entities?"));
        assert_eq!(request[3], ChatMessage::new("user", "posts and users"));
    }

    #[tokio::test]
    async fn test_full_history_is_sent_every_call() {
        let backend = Arc::new(ScriptedBackend::new(vec![Some("ok".into()), Some("ok".into())]));
        let engine = ConversationEngine::new(backend.clone());

        let conv = history();
        engine.respond(&conv).await.unwrap();
        let longer = conv.with_message(Message::user("add comments"));
        engine.respond(&longer).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), 4);
        assert_eq!(calls[1].len(), 5);
        assert!(calls.iter().all(|c| c[0].role == "system"));
    }

    #[tokio::test]
    async fn test_schema_reply_is_tagged_response() {
        let output = "```sql\nCREATE TABLE posts (id INT PRIMARY KEY);\n```\nDoes this look good?";
        let engine = ConversationEngine::new(Arc::new(ScriptedBackend::new(vec![Some(output.into())])));

        let reply = engine.respond(&history()).await.unwrap();
        assert_eq!(reply.content, output);
        assert_eq!(reply.schema.as_sql(), Some("CREATE TABLE posts (id INT PRIMARY KEY);"));
        assert_eq!(reply.text, "Does this look good?");
        assert_eq!(reply.to_message().tag, Some(MessageTag::Response));
    }

    #[tokio::test]
    async fn test_question_reply_is_tagged_question() {
        let engine = ConversationEngine::new(Arc::new(ScriptedBackend::new(vec![Some(
            "What should a post contain?".into(),
        )])));
        let reply = engine.respond(&history()).await.unwrap();
        assert_eq!(reply.tag(), MessageTag::Question);
        assert_eq!(reply.text, "What should a post contain?");
    }

    #[tokio::test]
    async fn test_empty_output_is_fatal() {
        for output in [None, Some(String::new()), Some("  \n ".to_string())] {
            let engine = ConversationEngine::new(Arc::new(ScriptedBackend::new(vec![output])));
            let err = engine.respond(&history()).await.unwrap_err();
            assert!(matches!(err, EngineError::EmptyResponse));
        }
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::failing("connection reset"));
        let engine = ConversationEngine::new(backend.clone());
        let err = engine.respond(&history()).await.unwrap_err();
        assert!(matches!(err, EngineError::Backend(_)));
        assert_eq!(backend.calls().len(), 1);
    }

    proptest! {
        #[test]
        fn prop_same_output_same_reply(output in "\\PC{1,200}") {
            prop_assume!(!output.trim().is_empty());
            let engine = ConversationEngine::new(Arc::new(ScriptedBackend::repeating(&output)));
            let first = tokio_test::block_on(engine.respond(&history())).unwrap();
            let second = tokio_test::block_on(engine.respond(&history())).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
