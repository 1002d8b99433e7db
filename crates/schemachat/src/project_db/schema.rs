//! Record types for the project store
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// Schema payload produced by the model.
///
/// On the wire this is `null`, a JSON string of SQL, or any other JSON value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Value>", into = "Option<Value>")]
pub enum SchemaPayload {
    #[default]
    Empty,
    RawSql(String),
    Structured(Value),
}

impl SchemaPayload {
    /// Blank SQL and empty objects/arrays count as empty, so they never
    /// overwrite a stored schema.
    pub fn is_empty(&self) -> bool {
        match self {
            SchemaPayload::Empty => true,
            SchemaPayload::RawSql(sql) => sql.trim().is_empty(),
            SchemaPayload::Structured(Value::Object(map)) => map.is_empty(),
            SchemaPayload::Structured(Value::Array(items)) => items.is_empty(),
            SchemaPayload::Structured(Value::Null) => true,
            SchemaPayload::Structured(_) => false,
        }
    }

    pub fn as_sql(&self) -> Option<&str> {
        match self {
            SchemaPayload::RawSql(sql) => Some(sql),
            _ => None,
        }
    }

    /// `name` field of a structured schema, if it has one.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            SchemaPayload::Structured(value) => value
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty()),
            _ => None,
        }
    }
}

impl From<Option<Value>> for SchemaPayload {
    fn from(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => SchemaPayload::Empty,
            Some(Value::String(sql)) => SchemaPayload::RawSql(sql),
            Some(other) => SchemaPayload::Structured(other),
        }
    }
}

impl From<SchemaPayload> for Option<Value> {
    fn from(payload: SchemaPayload) -> Self {
        match payload {
            SchemaPayload::Empty => None,
            SchemaPayload::RawSql(sql) => Some(Value::String(sql)),
            SchemaPayload::Structured(value) => Some(value),
        }
    }
}

/// A persisted conversation together with its current schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub owner: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schema: SchemaPayload,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing entry for `GET /projects`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Fields a caller may supply on create or update. Absent and empty values
/// leave the stored value in place on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectWrite {
    #[serde(default)]
    pub schema: SchemaPayload,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub name: Option<String>,
}

pub const SCHEMA_SQL: &str = "
-- Projects: one row per conversation, messages kept as a JSON array
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    name TEXT,
    schema_payload TEXT,
    messages TEXT NOT NULL DEFAULT '[]',
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects (owner, updated_at);
";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_from_wire_values() {
        let empty: SchemaPayload = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(empty, SchemaPayload::Empty);

        let sql: SchemaPayload = serde_json::from_value(json!("CREATE TABLE a (id INT)")).unwrap();
        assert_eq!(sql.as_sql(), Some("CREATE TABLE a (id INT)"));

        let obj: SchemaPayload = serde_json::from_value(json!({"name": "shop"})).unwrap();
        assert_eq!(obj.display_name(), Some("shop"));
    }

    #[test]
    fn test_empty_payload_serializes_as_null() {
        assert_eq!(serde_json::to_value(SchemaPayload::Empty).unwrap(), json!(null));
    }

    #[test]
    fn test_is_empty_covers_blank_values() {
        assert!(SchemaPayload::Empty.is_empty());
        assert!(SchemaPayload::RawSql("  \n".into()).is_empty());
        assert!(SchemaPayload::Structured(json!({})).is_empty());
        assert!(!SchemaPayload::RawSql("CREATE TABLE a (id INT)".into()).is_empty());
        assert!(!SchemaPayload::Structured(json!({"tables": []})).is_empty());
    }

    #[test]
    fn test_project_write_defaults_when_fields_missing() {
        let write: ProjectWrite = serde_json::from_value(json!({})).unwrap();
        assert_eq!(write, ProjectWrite::default());

        let write: ProjectWrite =
            serde_json::from_value(json!({"schema": null, "messages": null})).unwrap();
        assert!(write.schema.is_empty());
        assert!(write.messages.is_none());
    }

    #[test]
    fn test_project_uses_camel_case_timestamps() {
        let now = Utc::now();
        let project = Project {
            id: "p1".into(),
            owner: "ada@example.com".into(),
            name: None,
            schema: SchemaPayload::Empty,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&project).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert_eq!(value["schema"], json!(null));
    }
}
