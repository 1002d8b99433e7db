//! API endpoints for conversation turns

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::api::ValidatedJson;
use crate::conversation::AssistantReply;
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::message::{Conversation, Message};
use crate::presentation::{run_turn, TurnOutcome, TurnRequest};
use crate::shared_state::AppState;

/// Body of `POST /conversation`: the full history, newest message last
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConversationRequest {
    #[validate(length(min = 1, max = 1000, message = "messages must hold 1 to 1000 entries"))]
    pub messages: Vec<Message>,
}

/// One stateless engine call over client-held history. Nothing is stored.
pub async fn converse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<ConversationRequest>,
) -> Result<Json<AssistantReply>, ApiError> {
    info!(
        "Conversation request from {} with {} messages",
        user.owner_key(),
        request.messages.len()
    );
    let history = Conversation::new(request.messages);
    let reply = state.engine.respond(&history).await?;
    Ok(Json(reply))
}

/// Full turn: engine call plus the project write
pub async fn conversation_turn(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<TurnRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    if let Some(id) = &request.project_id {
        crate::api::validate_project_id(id)?;
    }
    let outcome = run_turn(
        &state.engine,
        &state.database.projects,
        user.owner_key(),
        request,
    )
    .await?;
    Ok(Json(outcome))
}
