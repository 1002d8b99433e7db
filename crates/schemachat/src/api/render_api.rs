//! API endpoint for rendering SQL as table views

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::api::ValidatedJson;
use crate::error::ApiError;
use crate::presentation::{render_sql, TableView};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenderSqlRequest {
    #[validate(length(max = 100000, message = "sql too long (max 100000 chars)"))]
    pub sql: String,
}

/// Pure rendering; needs neither identity nor store.
pub async fn render_sql_tables(
    ValidatedJson(request): ValidatedJson<RenderSqlRequest>,
) -> Result<Json<Vec<TableView>>, ApiError> {
    let tables = render_sql(&request.sql);
    debug!("Rendered {} tables", tables.len());
    Ok(Json(tables))
}
