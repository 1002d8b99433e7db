//! Conversation module - language model calls and reply parsing
pub mod backend;
pub mod engine;
pub mod reply_parser;

pub use backend::{ChatBackend, ChatMessage, OpenAiBackend};
pub use engine::{AssistantReply, ConversationEngine, EngineError, SYSTEM_PROMPT};
pub use reply_parser::{parse_reply, ParsedReply};
