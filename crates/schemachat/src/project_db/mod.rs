//! Project database module - SQLite-backed document store for projects
pub mod migration;
pub mod project_store;
pub mod schema;

pub use migration::MigrationManager;
pub use project_store::{merge_project, ProjectStore};
pub use schema::*;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct ProjectDatabase {
    pub projects: ProjectStore,
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl ProjectDatabase {
    /// Open the store named by a connection string: `sqlite://<path>`,
    /// `sqlite::memory:` or a bare file path.
    pub fn from_url(url: &str) -> anyhow::Result<Self> {
        match url.trim() {
            "sqlite::memory:" | ":memory:" => Self::new_in_memory(),
            other => {
                let path = other.strip_prefix("sqlite://").unwrap_or(other);
                if path.is_empty() {
                    anyhow::bail!("Database URL has no path: {}", url);
                }
                Self::new(Path::new(path))
            }
        }
    }

    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        info!("Opening project database at: {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                    | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
            )
            .with_init(|conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;",
                )
            });
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;

        Self::with_pool(pool)
    }

    /// Single-connection in-memory store; every pooled checkout sees the same data
    pub fn new_in_memory() -> anyhow::Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;
        Self::with_pool(pool)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>) -> anyhow::Result<Self> {
        {
            let mut conn = pool.get()?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }
        let pool = Arc::new(pool);
        info!("Project database initialized successfully");
        Ok(Self {
            projects: ProjectStore::new(Arc::clone(&pool)),
            pool,
        })
    }

    /// Cheap liveness probe used by the health endpoint
    pub fn ping(&self) -> anyhow::Result<()> {
        let conn = self.pool.get()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}
