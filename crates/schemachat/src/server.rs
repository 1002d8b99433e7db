//! HTTP server startup and routing.
//!
//! One request makes at most one model call and one store write; there are
//! no background workers.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{api, config::Config, metrics, shared_state::AppState};

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Run the service until the listener fails
pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    crate::metrics::init_metrics();
    cfg.print_config();

    let addr = cfg.api_addr()?;
    let state = AppState::from_config(cfg)?;

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}

/// Restrictive CORS when origins are configured, wildcard otherwise
fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

async fn track_requests(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let response = next.run(req).await;
    metrics::inc_request(&route, response.status().as_str());
    response
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    match state.database.ping() {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    Router::new()
        // Project storage, owner scoped
        .route("/projects", get(api::list_projects).post(api::create_project))
        .route("/projects/:id", get(api::get_project).put(api::update_project))
        .route("/projects/:id/transcript", get(api::get_transcript))
        // Conversation turns
        .route("/conversation", post(api::converse))
        .route("/conversation/turn", post(api::conversation_turn))
        .route("/render/sql", post(api::render_sql_tables))
        .route("/session", get(api::get_session))
        .route_layer(middleware::from_fn(track_requests))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics::get_metrics))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}
