//! API endpoints for project storage

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::api::{validate_project_id, ValidatedJson};
use crate::error::ApiError;
use crate::identity::CurrentUser;
use crate::message::Message;
use crate::metrics;
use crate::presentation::{render_transcript, RenderedMessage};
use crate::project_db::{Project, ProjectSummary, ProjectWrite, SchemaPayload};
use crate::shared_state::AppState;

/// Body of `POST /projects` and `PUT /projects/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProjectBody {
    #[serde(default)]
    pub schema: SchemaPayload,
    #[serde(default)]
    #[validate(length(max = 1000, message = "too many messages (max 1000)"))]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    #[validate(length(max = 200, message = "name too long (max 200 chars)"))]
    pub name: Option<String>,
}

impl From<ProjectBody> for ProjectWrite {
    fn from(body: ProjectBody) -> Self {
        ProjectWrite {
            schema: body.schema,
            messages: body.messages,
            name: body.name,
        }
    }
}

/// List the caller's projects
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let projects = state.database.projects.list_for_owner(user.owner_key())?;
    info!("Found {} projects", projects.len());
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    validate_project_id(&id)?;
    state
        .database
        .projects
        .get_for_owner(&id, user.owner_key())?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(body): ValidatedJson<ProjectBody>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state.database.projects.create(user.owner_key(), body.into())?;
    metrics::inc_project_write("create");
    Ok((StatusCode::CREATED, Json(project)))
}

/// Merge-update; empty fields keep the stored values
pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<ProjectBody>,
) -> Result<Json<Project>, ApiError> {
    validate_project_id(&id)?;
    let project = state
        .database
        .projects
        .update(&id, user.owner_key(), body.into())?
        .ok_or(ApiError::NotFound)?;
    metrics::inc_project_write("update");
    Ok(Json(project))
}

/// Every message of the project split into display blocks
pub async fn get_transcript(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<RenderedMessage>>, ApiError> {
    validate_project_id(&id)?;
    let project = state
        .database
        .projects
        .get_for_owner(&id, user.owner_key())?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(render_transcript(&project)))
}
