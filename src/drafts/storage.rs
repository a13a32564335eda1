use super::types::{draft_key, Draft};
use crate::database::{Database, DbError};

impl Database {
    /// Create the drafts table
    pub fn create_drafts_table(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS drafts (
                key TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                content TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Overwrite the stored draft for a document
    pub fn save_draft(&self, document: &str, content: &str) -> Result<Draft, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;
        let now = chrono::Utc::now().timestamp_millis();

        conn.execute(
            "INSERT OR REPLACE INTO drafts (key, document, content, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![draft_key(document), document, content, now],
        )?;

        Ok(Draft {
            document: document.to_string(),
            content: content.to_string(),
            updated_at: now,
        })
    }

    pub fn get_draft(&self, document: &str) -> Result<Option<Draft>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let mut stmt = conn.prepare(
            "SELECT document, content, updated_at FROM drafts WHERE key = ?1",
        )?;

        let mut rows = stmt.query([draft_key(document)])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Draft {
                document: row.get(0)?,
                content: row.get(1)?,
                updated_at: row.get(2)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Returns whether a draft existed
    pub fn delete_draft(&self, document: &str) -> Result<bool, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let affected = conn.execute("DELETE FROM drafts WHERE key = ?1", [draft_key(document)])?;

        Ok(affected > 0)
    }

    /// All drafts, most recently edited first
    pub fn list_drafts(&self) -> Result<Vec<Draft>, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let mut stmt = conn.prepare(
            "SELECT document, content, updated_at FROM drafts ORDER BY updated_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Draft {
                document: row.get(0)?,
                content: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;

        let mut drafts = Vec::new();
        for row in rows {
            drafts.push(row?);
        }

        Ok(drafts)
    }
}
