//! Splits raw model output into a schema payload and free text.
//!
//! Order of attempts:
//! 1. the whole output as a JSON object,
//! 2. the first fenced code block (optionally tagged `sql` or `json`),
//! 3. the whole output as plain text.
//!
//! Falling through to a later step is the normal path, not an error.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::project_db::SchemaPayload;

lazy_static! {
    static ref FENCED_BLOCK_REGEX: Regex =
        Regex::new(r"```(?:sql|json)?\s*([\s\S]*?)\s*```").unwrap();
}

/// Keys that mark a JSON object as a `{schema, content}` style envelope
/// rather than a bare schema document.
const ENVELOPE_KEYS: [&str; 3] = ["schema", "content", "text"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub schema: SchemaPayload,
    pub text: String,
}

/// Parse one model output. Pure: equal input always gives equal output.
pub fn parse_reply(raw: &str) -> ParsedReply {
    if let Some(parsed) = parse_structured(raw) {
        return parsed;
    }
    if let Some(parsed) = parse_fenced(raw) {
        return parsed;
    }
    ParsedReply {
        schema: SchemaPayload::Empty,
        text: raw.to_string(),
    }
}

fn parse_structured(raw: &str) -> Option<ParsedReply> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(map)) => Some(from_object(map)),
        _ => None,
    }
}

fn from_object(mut map: Map<String, Value>) -> ParsedReply {
    if !ENVELOPE_KEYS.iter().any(|key| map.contains_key(*key)) {
        return ParsedReply {
            schema: SchemaPayload::Structured(Value::Object(map)),
            text: String::new(),
        };
    }

    let schema = SchemaPayload::from(map.remove("schema"));
    let text = ["content", "text"]
        .iter()
        .find_map(|key| match map.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default();
    ParsedReply { schema, text }
}

fn parse_fenced(raw: &str) -> Option<ParsedReply> {
    let captures = FENCED_BLOCK_REGEX.captures(raw)?;
    let whole = captures.get(0)?;
    let interior = captures.get(1).map(|m| m.as_str()).unwrap_or("");

    Some(ParsedReply {
        schema: classify_block(interior),
        text: raw[whole.end()..].trim().to_string(),
    })
}

/// `{...}` blocks that parse as JSON are structured; anything else is SQL.
fn classify_block(interior: &str) -> SchemaPayload {
    if interior.starts_with('{') {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(interior) {
            return SchemaPayload::Structured(value);
        }
    }
    SchemaPayload::RawSql(interior.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_has_no_schema() {
        let raw = "Got it. What entities do you need to track?";
        let parsed = parse_reply(raw);
        assert_eq!(parsed.schema, SchemaPayload::Empty);
        assert_eq!(parsed.text, raw);

        let wire = serde_json::to_value(&parsed).unwrap();
        assert_eq!(wire, json!({"schema": null, "text": raw}));
    }

    #[test]
    fn test_sql_fence_splits_schema_and_trailing_text() {
        let raw = "Got it, let's start with users.\n\n```sql\nCREATE TABLE users (\n  id INT PRIMARY KEY\n);\n```\n\n- Does this look good?\n- Need to add more features?";
        let parsed = parse_reply(raw);
        assert_eq!(
            parsed.schema.as_sql(),
            Some("CREATE TABLE users (\n  id INT PRIMARY KEY\n);")
        );
        assert_eq!(parsed.text, "- Does this look good?\n- Need to add more features?");
    }

    #[test]
    fn test_untagged_fence_is_sql() {
        let parsed = parse_reply("```\nCREATE TABLE a (id INT);\n```");
        assert_eq!(parsed.schema.as_sql(), Some("CREATE TABLE a (id INT);"));
        assert_eq!(parsed.text, "");
    }

    #[test]
    fn test_json_fence_becomes_structured() {
        let raw = "```json\n{\"name\": \"shop\", \"tables\": []}\n```\nAnything else?";
        let parsed = parse_reply(raw);
        assert_eq!(
            parsed.schema,
            SchemaPayload::Structured(json!({"name": "shop", "tables": []}))
        );
        assert_eq!(parsed.text, "Anything else?");
    }

    #[test]
    fn test_invalid_json_fence_falls_back_to_raw() {
        let parsed = parse_reply("```json\n{not json}\n```");
        assert_eq!(parsed.schema.as_sql(), Some("{not json}"));
    }

    #[test]
    fn test_only_first_fence_is_used() {
        let raw = "```sql\nCREATE TABLE a (id INT);\n```\nand\n```sql\nCREATE TABLE b (id INT);\n```";
        let parsed = parse_reply(raw);
        assert_eq!(parsed.schema.as_sql(), Some("CREATE TABLE a (id INT);"));
        assert!(parsed.text.starts_with("and"));
    }

    #[test]
    fn test_envelope_object() {
        let raw = r#"{"content": "Here you go", "schema": "CREATE TABLE a (id INT);"}"#;
        let parsed = parse_reply(raw);
        assert_eq!(parsed.schema.as_sql(), Some("CREATE TABLE a (id INT);"));
        assert_eq!(parsed.text, "Here you go");

        let parsed = parse_reply(r#"{"text": "Which fields?", "schema": null}"#);
        assert_eq!(parsed.schema, SchemaPayload::Empty);
        assert_eq!(parsed.text, "Which fields?");
    }

    #[test]
    fn test_bare_object_is_the_schema() {
        let parsed = parse_reply(r#"  {"tables": [{"name": "users"}]}  "#);
        assert_eq!(
            parsed.schema,
            SchemaPayload::Structured(json!({"tables": [{"name": "users"}]}))
        );
        assert_eq!(parsed.text, "");
    }

    #[test]
    fn test_non_object_json_is_text() {
        let parsed = parse_reply("42");
        assert_eq!(parsed.schema, SchemaPayload::Empty);
        assert_eq!(parsed.text, "42");
    }

    proptest! {
        #[test]
        fn prop_parse_is_deterministic(raw in "(.|\n){0,300}") {
            let first = serde_json::to_string(&parse_reply(&raw)).unwrap();
            let second = serde_json::to_string(&parse_reply(&raw)).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_fence_free_text_is_kept_whole(raw in "[a-zA-Z ,.?!\n]{0,200}") {
            let parsed = parse_reply(&raw);
            prop_assert_eq!(parsed.schema, SchemaPayload::Empty);
            prop_assert_eq!(parsed.text, raw);
        }
    }
}
