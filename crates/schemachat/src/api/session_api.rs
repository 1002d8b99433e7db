//! API endpoint exposing the signed-in caller

use axum::Json;

use crate::identity::{CurrentUser, Identity};

/// 401 through the extractor when nobody is signed in
pub async fn get_session(CurrentUser(user): CurrentUser) -> Json<Identity> {
    Json(user)
}
