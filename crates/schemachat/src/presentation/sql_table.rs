//! Renders `CREATE TABLE` text into column tables for display.
//!
//! This is a display helper, not a SQL parser: statements that do not look
//! like `CREATE TABLE <name> ( ... )` are skipped without error, because
//! partial model output is expected. Column bodies are split on every comma,
//! so a type such as `DECIMAL(10,2)` is split as well, and constraint flags
//! are found by plain substring search on the type text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::TextUtils;

lazy_static! {
    static ref CREATE_TABLE_REGEX: Regex =
        Regex::new(r"(?i)CREATE TABLE\s+(\w+)\s*\(([\s\S]*)\)").unwrap();
}

const FOREIGN_KEY_PREFIX: &str = "FOREIGN KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnConstraint {
    PrimaryKey,
    NotNull,
    Unique,
    ForeignKey,
    /// A table-level `FOREIGN KEY ...` clause attached to the column before it
    References(String),
}

impl ColumnConstraint {
    pub fn label(&self) -> String {
        match self {
            ColumnConstraint::PrimaryKey => "Primary Key".to_string(),
            ColumnConstraint::NotNull => "Not Null".to_string(),
            ColumnConstraint::Unique => "Unique".to_string(),
            ColumnConstraint::ForeignKey => "Foreign Key".to_string(),
            ColumnConstraint::References(clause) => format!("FK: {}", clause),
        }
    }
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Keyword searched in the type text, and the flag it raises.
const CONSTRAINT_KEYWORDS: [(&str, ColumnConstraint); 4] = [
    ("PRIMARY KEY", ColumnConstraint::PrimaryKey),
    ("NOT NULL", ColumnConstraint::NotNull),
    ("UNIQUE", ColumnConstraint::Unique),
    ("FOREIGN KEY", ColumnConstraint::ForeignKey),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub name: String,
    /// Type text with the first occurrence of each constraint keyword removed
    pub data_type: String,
    #[serde(skip)]
    pub constraints: Vec<ColumnConstraint>,
    /// Display labels, e.g. `["Primary Key", "Not Null"]`
    #[serde(rename = "constraints")]
    pub constraint_labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub name: String,
    pub columns: Vec<ColumnView>,
}

/// Column as split from the body, before flags are derived
struct RawColumn {
    name: String,
    type_text: String,
    foreign_keys: Vec<String>,
}

/// Render every well-formed `CREATE TABLE` statement in `sql`.
pub fn render_sql(sql: &str) -> Vec<TableView> {
    sql.split(';')
        .filter(|stmt| !stmt.trim().is_empty())
        .filter_map(render_statement)
        .collect()
}

fn render_statement(statement: &str) -> Option<TableView> {
    let normalized = TextUtils::normalize_whitespace(statement);
    let captures = CREATE_TABLE_REGEX.captures(&normalized)?;
    let name = captures.get(1)?.as_str().to_string();
    let body = captures.get(2)?.as_str();

    let columns = split_columns(body).into_iter().map(build_column).collect();
    Some(TableView { name, columns })
}

fn split_columns(body: &str) -> Vec<RawColumn> {
    let mut columns: Vec<RawColumn> = Vec::new();
    for fragment in body.split(',') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if fragment.starts_with(FOREIGN_KEY_PREFIX) {
            if let Some(previous) = columns.last_mut() {
                previous.foreign_keys.push(fragment.to_string());
            }
            continue;
        }
        let (name, type_text) = TextUtils::split_first_token(fragment);
        columns.push(RawColumn {
            name: name.to_string(),
            type_text,
            foreign_keys: Vec::new(),
        });
    }
    columns
}

fn build_column(raw: RawColumn) -> ColumnView {
    let mut constraints: Vec<ColumnConstraint> = CONSTRAINT_KEYWORDS
        .iter()
        .filter(|(keyword, _)| raw.type_text.contains(keyword))
        .map(|(_, flag)| flag.clone())
        .collect();
    constraints.extend(raw.foreign_keys.into_iter().map(ColumnConstraint::References));

    let mut data_type = raw.type_text;
    for (keyword, _) in CONSTRAINT_KEYWORDS.iter() {
        data_type = data_type.replacen(keyword, "", 1);
    }

    ColumnView {
        name: raw.name,
        data_type: data_type.trim().to_string(),
        constraint_labels: constraints.iter().map(ColumnConstraint::label).collect(),
        constraints,
    }
}
