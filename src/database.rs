use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const DB_FILENAME: &str = "sp-studio.db";
const APP_DIR: &str = "sp-studio";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to acquire database lock")]
    Lock,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not determine the local data directory")]
    NoDataDir,
}

/// Local SQLite store for settings and unsaved drafts
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Open the database in the platform data directory
    pub fn new() -> Result<Self, DbError> {
        let path = default_db_path()?;
        Self::open(&path)
    }

    /// Open (or create) the database at the given path
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened local database");
        Self::with_connection(conn)
    }

    /// In-memory database, used by tests and `--db :memory:`
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DbError> {
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.create_settings_table()?;
        db.create_drafts_table()?;
        Ok(db)
    }
}

/// `<data dir>/sp-studio/sp-studio.db`
pub fn default_db_path() -> Result<PathBuf, DbError> {
    let base = dirs::data_dir().ok_or(DbError::NoDataDir)?;
    Ok(base.join(APP_DIR).join(DB_FILENAME))
}
