use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::types::Draft;
use crate::database::{Database, DbError};

pub const DEFAULT_DRAFT_DELAY: Duration = Duration::from_millis(1000);

/// A debounced write waiting for the idle window to pass
struct PendingWrite {
    generation: u64,
    document: String,
    content: String,
    handle: JoinHandle<()>,
}

/// Draft store with a single cancellable scheduled write.
///
/// Every `schedule_save` replaces the previous pending write, so a burst of
/// edits inside the idle window produces exactly one stored draft holding the
/// final buffer. `schedule_save` must be called from inside a tokio runtime.
pub struct DraftStore {
    db: Arc<Database>,
    delay: Duration,
    pending: Arc<Mutex<Option<PendingWrite>>>,
    generation: AtomicU64,
    writes: Arc<AtomicU64>,
}

impl DraftStore {
    pub fn new(db: Arc<Database>, delay: Duration) -> Self {
        Self {
            db,
            delay,
            pending: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Overwrite the stored draft now, superseding any pending write for it
    pub fn save(&self, document: &str, content: &str) -> Result<(), DbError> {
        self.cancel_for(document)?;
        self.write(document, content)
    }

    pub fn load(&self, document: &str) -> Result<Option<String>, DbError> {
        Ok(self.db.get_draft(document)?.map(|d| d.content))
    }

    pub fn load_draft(&self, document: &str) -> Result<Option<Draft>, DbError> {
        self.db.get_draft(document)
    }

    /// Drop the stored draft and any pending write for the same document
    pub fn remove(&self, document: &str) -> Result<bool, DbError> {
        self.cancel_for(document)?;
        self.db.delete_draft(document)
    }

    pub fn list(&self) -> Result<Vec<Draft>, DbError> {
        self.db.list_drafts()
    }

    /// Debounced save: persisted once no newer edit arrives within the delay
    pub fn schedule_save(&self, document: &str, content: &str) -> Result<(), DbError> {
        let mut pending = self.pending.lock().map_err(|_| DbError::Lock)?;

        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.delay;
        let db = self.db.clone();
        let slot = self.pending.clone();
        let writes = self.writes.clone();

        // The slot lock is held until the entry is inserted, so the task can
        // never observe the slot before its own write is registered.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut guard = match slot.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            let current = guard.as_ref().map(|p| p.generation) == Some(generation);
            if !current {
                return;
            }
            if let Some(write) = guard.take() {
                match db.save_draft(&write.document, &write.content) {
                    Ok(_) => {
                        writes.fetch_add(1, Ordering::SeqCst);
                        tracing::debug!(document = %write.document, "draft autosaved");
                    }
                    Err(e) => {
                        tracing::warn!(document = %write.document, error = %e, "draft autosave failed");
                    }
                }
            }
        });

        *pending = Some(PendingWrite {
            generation,
            document: document.to_string(),
            content: content.to_string(),
            handle,
        });

        Ok(())
    }

    /// Write the pending edit immediately. Returns whether anything was written.
    pub fn flush(&self) -> Result<bool, DbError> {
        let write = {
            let mut pending = self.pending.lock().map_err(|_| DbError::Lock)?;
            pending.take()
        };

        match write {
            Some(write) => {
                write.handle.abort();
                self.write(&write.document, &write.content)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the pending edit without writing it
    pub fn cancel(&self) -> Result<(), DbError> {
        let mut pending = self.pending.lock().map_err(|_| DbError::Lock)?;
        if let Some(write) = pending.take() {
            write.handle.abort();
        }
        Ok(())
    }

    pub fn pending_document(&self) -> Option<String> {
        self.pending
            .lock()
            .ok()
            .and_then(|p| p.as_ref().map(|w| w.document.clone()))
    }

    /// Number of drafts persisted through this store
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn cancel_for(&self, document: &str) -> Result<(), DbError> {
        let mut pending = self.pending.lock().map_err(|_| DbError::Lock)?;
        if pending.as_ref().map(|p| p.document == document).unwrap_or(false) {
            if let Some(write) = pending.take() {
                write.handle.abort();
            }
        }
        Ok(())
    }

    fn write(&self, document: &str, content: &str) -> Result<(), DbError> {
        self.db.save_draft(document, content)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for DraftStore {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(write) = pending.take() {
                write.handle.abort();
            }
        }
    }
}
