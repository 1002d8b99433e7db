//! Application state shared by every handler.
//!
//! Everything here is read-only after startup; per-request data lives in
//! the request and in the store, never in this struct.

use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    conversation::{ChatBackend, ConversationEngine, OpenAiBackend},
    identity::{HttpIdentityProvider, IdentityProvider},
    project_db::ProjectDatabase,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Arc<ProjectDatabase>,
    pub engine: ConversationEngine,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        config: Config,
        database: Arc<ProjectDatabase>,
        backend: Arc<dyn ChatBackend>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            database,
            engine: ConversationEngine::new(backend),
            identity,
        }
    }

    /// Wire the production collaborators named by `config`.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let database = Arc::new(ProjectDatabase::from_url(&config.database_url)?);
        let backend: Arc<dyn ChatBackend> = Arc::new(OpenAiBackend::from_config(&config)?);
        let identity: Arc<dyn IdentityProvider> = Arc::new(HttpIdentityProvider::from_config(&config)?);
        info!("Application state initialized");
        Ok(Self::new(config, database, backend, identity))
    }
}
