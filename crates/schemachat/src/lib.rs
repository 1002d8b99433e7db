// schemachat/crates/schemachat/src/lib.rs

pub mod api;
pub mod config;
pub mod conversation;
pub mod error;
pub mod identity;
pub mod message;
pub mod metrics;
pub mod presentation;
pub mod project_db;
pub mod server;
pub mod shared_state;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Public API exports
pub use config::Config;
pub use conversation::{parse_reply, AssistantReply, ConversationEngine, EngineError, ParsedReply};
pub use error::ApiError;
pub use identity::{Identity, IdentityProvider};
pub use message::{Conversation, Message, MessageTag, Role};
pub use presentation::{render_message, render_sql, render_transcript, run_turn, RenderedMessage, TableView};
pub use project_db::{Project, ProjectDatabase, ProjectStore, ProjectSummary, ProjectWrite, SchemaPayload};
pub use server::{build_router, run_server};
pub use shared_state::AppState;
