//! API module - HTTP handlers for projects, conversation turns and rendering

pub mod conversation_api;
pub mod project_api;
pub mod render_api;
pub mod session_api;

use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

pub use conversation_api::{converse, conversation_turn, ConversationRequest};
pub use project_api::{create_project, get_project, get_transcript, list_projects, update_project, ProjectBody};
pub use render_api::{render_sql_tables, RenderSqlRequest};
pub use session_api::get_session;

/// JSON body that has passed its `validator` rules.
///
/// Malformed JSON and failed validation both become a 400 with an
/// `{"error": ...}` body.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Project ids are UUIDs. Anything that does not parse cannot name a
/// stored project, so it gets the same 404 as a missing one.
pub(crate) fn validate_project_id(id: &str) -> Result<(), ApiError> {
    Uuid::parse_str(id).map(|_| ()).map_err(|_| ApiError::NotFound)
}
