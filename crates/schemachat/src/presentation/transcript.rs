//! Display blocks for stored messages.
//!
//! Every message goes through the same `parse_reply` the engine uses, so a
//! stored turn renders exactly as it did when it was produced.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conversation::parse_reply;
use crate::message::{Message, MessageTag, Role};
use crate::presentation::sql_table::{render_sql, TableView};
use crate::project_db::{Project, SchemaPayload};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub role: Role,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<MessageTag>,
    /// Pretty-printed structured schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    /// Tables rendered from `sql`
    #[serde(default)]
    pub tables: Vec<TableView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub text: String,
}

pub fn render_message(message: &Message) -> RenderedMessage {
    let parsed = parse_reply(&message.content);

    let (json, sql) = match parsed.schema {
        SchemaPayload::Empty => (None, None),
        SchemaPayload::RawSql(sql) => (None, Some(sql)),
        SchemaPayload::Structured(value) => (serde_json::to_string_pretty(&value).ok(), None),
    };
    let tables = sql.as_deref().map(render_sql).unwrap_or_default();

    RenderedMessage {
        role: message.role,
        tag: message.tag,
        json,
        tables,
        sql,
        text: parsed.text,
    }
}

pub fn render_transcript(project: &Project) -> Vec<RenderedMessage> {
    debug!("Rendering {} messages for project {}", project.messages.len(), project.id);
    project.messages.iter().map(render_message).collect()
}
