//! One full "send message" turn: history in, engine call, one store write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use validator::Validate;

use crate::conversation::{AssistantReply, ConversationEngine, EngineError};
use crate::message::{Conversation, Message};
use crate::metrics;
use crate::project_db::{Project, ProjectStore, ProjectWrite};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    /// Continue this project; history is then loaded from the store
    #[serde(default)]
    pub project_id: Option<String>,
    /// Client-held history for a project that does not exist yet
    #[serde(default)]
    #[validate(length(max = 1000, message = "too many messages (max 1000)"))]
    pub messages: Vec<Message>,
    #[validate(length(max = 20000, message = "input too long (max 20000 chars)"))]
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub project: Project,
    pub reply: AssistantReply,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("input must not be empty")]
    EmptyInput,
    #[error("project not found")]
    NotFound,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("project store failure: {0}")]
    Store(#[from] anyhow::Error),
}

/// Name given to a project created by its first turn, e.g. `Project 3/14/2025`.
pub fn default_project_name(now: DateTime<Utc>) -> String {
    format!("Project {}", now.format("%-m/%-d/%Y"))
}

/// Run one turn for `owner`.
///
/// Nothing is written when the engine fails, so the caller can resubmit
/// the same input.
pub async fn run_turn(
    engine: &ConversationEngine,
    store: &ProjectStore,
    owner: &str,
    request: TurnRequest,
) -> Result<TurnOutcome, TurnError> {
    let input = request.input.trim();
    if input.is_empty() {
        return Err(TurnError::EmptyInput);
    }

    let history = match &request.project_id {
        Some(id) => {
            let project = store.get_for_owner(id, owner)?.ok_or(TurnError::NotFound)?;
            Conversation::new(project.messages)
        }
        None => Conversation::new(request.messages),
    };
    if history.is_empty() {
        debug!("Starting a new conversation for {}", owner);
    }

    let conversation = history.with_message(Message::user(input));
    let reply = engine.respond(&conversation).await?;
    let conversation = conversation.with_message(reply.to_message());

    let write = ProjectWrite {
        schema: reply.schema.clone(),
        messages: Some(conversation.into_messages()),
        name: None,
    };

    let project = match &request.project_id {
        Some(id) => {
            let project = store.update(id, owner, write)?.ok_or(TurnError::NotFound)?;
            metrics::inc_project_write("update");
            project
        }
        None => {
            let project = store.create(
                owner,
                ProjectWrite {
                    name: Some(default_project_name(Utc::now())),
                    ..write
                },
            )?;
            metrics::inc_project_write("create");
            project
        }
    };

    info!(
        "Turn stored for project {} ({} messages, tag {:?})",
        project.id,
        project.messages.len(),
        reply.tag()
    );
    Ok(TurnOutcome { project, reply })
}
