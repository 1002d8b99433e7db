use crate::message::Message;
use crate::project_db::schema::*;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const PROJECT_COLUMNS: &str =
    "id, owner, name, schema_payload, messages, created_at, updated_at";

/// Owner-scoped access to project records.
///
/// Every read and write is keyed by `(id, owner)`; a record owned by someone
/// else behaves exactly like a missing one.
pub struct ProjectStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl ProjectStore {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> anyhow::Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))
    }

    pub fn get_for_owner(&self, id: &str, owner: &str) -> anyhow::Result<Option<Project>> {
        let conn = self.get_conn()?;
        Self::find_with_conn(&conn, id, owner)
    }

    /// Summaries of the owner's projects, most recently updated first
    pub fn list_for_owner(&self, owner: &str) -> anyhow::Result<Vec<ProjectSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, schema_payload, json_array_length(messages), created_at, updated_at
             FROM projects WHERE owner = ?1
             ORDER BY updated_at DESC, created_at DESC",
        )?;

        let rows = stmt.query_map([owner], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, name, schema_json, message_count, created_at, updated_at) = row?;
            let schema = decode_schema(schema_json.as_deref())?;
            let name = schema.display_name().map(str::to_string).or(name);
            summaries.push(ProjectSummary {
                id,
                name,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
                message_count: message_count.max(0) as usize,
            });
        }

        debug!("Listed {} projects for owner", summaries.len());
        Ok(summaries)
    }

    pub fn create(&self, owner: &str, write: ProjectWrite) -> anyhow::Result<Project> {
        let now = Utc::now().trunc_subsecs(6);
        let project = Project {
            id: Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            name: write.name.filter(|n| !n.trim().is_empty()),
            schema: write.schema,
            messages: write.messages.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO projects (id, owner, name, schema_payload, messages, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.id,
                project.owner,
                project.name,
                encode_schema(&project.schema)?,
                serde_json::to_string(&project.messages)?,
                format_timestamp(&project.created_at),
                format_timestamp(&project.updated_at),
            ],
        )?;

        info!("Created project {} ({} messages)", project.id, project.messages.len());
        Ok(project)
    }

    /// Merge `write` into the owner's project.
    ///
    /// Returns `None` when the project does not exist for this owner.
    pub fn update(&self, id: &str, owner: &str, write: ProjectWrite) -> anyhow::Result<Option<Project>> {
        let mut conn = self.get_conn()?;
        // Take the write lock up front: a read lock upgraded mid-transaction
        // fails with SQLITE_BUSY instead of waiting on busy_timeout.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(existing) = Self::find_with_conn(&tx, id, owner)? else {
            return Ok(None);
        };
        let merged = merge_project(existing, write, Utc::now());

        tx.execute(
            "UPDATE projects
             SET name = ?1, schema_payload = ?2, messages = ?3, updated_at = ?4
             WHERE id = ?5 AND owner = ?6",
            params![
                merged.name,
                encode_schema(&merged.schema)?,
                serde_json::to_string(&merged.messages)?,
                format_timestamp(&merged.updated_at),
                id,
                owner,
            ],
        )?;
        tx.commit()?;

        debug!("Updated project {} ({} messages)", merged.id, merged.messages.len());
        Ok(Some(merged))
    }

    #[cfg(test)]
    pub(crate) fn count_for_owner(&self, owner: &str) -> anyhow::Result<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE owner = ?1",
            [owner],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    fn find_with_conn(conn: &Connection, id: &str, owner: &str) -> anyhow::Result<Option<Project>> {
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM projects WHERE id = ?1 AND owner = ?2", PROJECT_COLUMNS),
                params![id, owner],
                RawProjectRow::from_row,
            )
            .optional()?;
        raw.map(RawProjectRow::into_project).transpose()
    }
}

/// Field-level merge used by `update`.
///
/// A non-empty schema, non-empty message list or non-blank name replaces the
/// stored value; anything else keeps it. `updated_at` always moves forward,
/// even when two writes land within the same clock tick.
pub fn merge_project(existing: Project, write: ProjectWrite, now: DateTime<Utc>) -> Project {
    let floor = existing.updated_at + Duration::microseconds(1);
    let updated_at = now.trunc_subsecs(6).max(floor);

    let schema = if write.schema.is_empty() {
        existing.schema
    } else {
        write.schema
    };
    let messages = match write.messages {
        Some(messages) if !messages.is_empty() => messages,
        _ => existing.messages,
    };
    let name = match write.name {
        Some(name) if !name.trim().is_empty() => Some(name),
        _ => existing.name,
    };

    Project {
        schema,
        messages,
        name,
        updated_at,
        ..existing
    }
}

struct RawProjectRow {
    id: String,
    owner: String,
    name: Option<String>,
    schema_payload: Option<String>,
    messages: String,
    created_at: String,
    updated_at: String,
}

impl RawProjectRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            name: row.get(2)?,
            schema_payload: row.get(3)?,
            messages: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_project(self) -> anyhow::Result<Project> {
        let messages: Vec<Message> = serde_json::from_str(&self.messages)?;
        Ok(Project {
            schema: decode_schema(self.schema_payload.as_deref())?,
            messages,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
            owner: self.owner,
            name: self.name,
        })
    }
}

fn encode_schema(schema: &SchemaPayload) -> anyhow::Result<Option<String>> {
    match schema {
        SchemaPayload::Empty => Ok(None),
        other => Ok(Some(serde_json::to_string(other)?)),
    }
}

fn decode_schema(raw: Option<&str>) -> anyhow::Result<SchemaPayload> {
    match raw {
        None => Ok(SchemaPayload::Empty),
        Some(json) => Ok(serde_json::from_str(json)?),
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
