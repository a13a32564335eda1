use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use super::template::{format_prompt, insert_variable, template_variables};
use super::types::*;
use crate::api::{Preset, PromptBackend};
use crate::confirm::{Confirm, ConfirmPrompt};
use crate::drafts::DraftStore;
use crate::error::ApiError;
use crate::ui::{LoadingIndicator, NotificationCenter, NotificationLevel};

const CONNECTED_NOTICE: Duration = Duration::from_millis(3000);
const LOADED_NOTICE: Duration = Duration::from_millis(2000);
const SHORT_NOTICE: Duration = Duration::from_millis(1000);

/// Prompt-template editor: owns the editor buffer, the selected document and
/// the lists shown next to it. All remote work goes through `PromptBackend`,
/// user feedback through the notification center, and destructive steps
/// through the injected `Confirm`.
pub struct EditorController<B: PromptBackend + ?Sized> {
    backend: Arc<B>,
    drafts: DraftStore,
    confirm: Arc<dyn Confirm>,
    notifications: Arc<NotificationCenter>,
    loading: Arc<LoadingIndicator>,
    events: Option<UnboundedSender<EditorEvent>>,
    state: EditorState,
    buffer: String,
    documents: Vec<String>,
    backups: Vec<String>,
    variables: Vec<String>,
    presets: Vec<Preset>,
    connected: bool,
    last_test_result: Option<String>,
}

impl<B: PromptBackend + ?Sized> EditorController<B> {
    pub fn new(
        backend: Arc<B>,
        drafts: DraftStore,
        confirm: Arc<dyn Confirm>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            backend,
            drafts,
            confirm,
            notifications,
            loading: Arc::new(LoadingIndicator::new()),
            events: None,
            state: EditorState::NoDocumentSelected,
            buffer: String::new(),
            documents: Vec::new(),
            backups: Vec::new(),
            variables: Vec::new(),
            presets: Vec::new(),
            connected: false,
            last_test_result: None,
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<EditorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_loading(mut self, loading: Arc<LoadingIndicator>) -> Self {
        self.loading = loading;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn current_document(&self) -> Option<&str> {
        self.state.document()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn backups(&self) -> &[String] {
        &self.backups
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_test_result(&self) -> Option<&str> {
        self.last_test_result.as_deref()
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    /// Page-load sequence: health, presets, documents (first one selected),
    /// backups. Every step runs; the first failure is returned.
    pub async fn bootstrap(&mut self) -> Result<(), ApiError> {
        let mut first_error = None;

        self.check_connection().await;

        if let Err(e) = self.load_presets().await {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.refresh_documents().await {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.refresh_backups().await {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Health probe; never fails, the outcome is the returned flag
    pub async fn check_connection(&mut self) -> bool {
        self.connected = match self.backend.health().await {
            Ok(_) => {
                self.notifications.show(
                    NotificationLevel::Success,
                    "Connected to the SP service",
                    None,
                    Some(CONNECTED_NOTICE),
                );
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "health check failed");
                self.notifications.error("Cannot reach the SP service");
                false
            }
        };
        self.connected
    }

    pub async fn load_presets(&mut self) -> Result<&[Preset], ApiError> {
        match self.backend.presets().await {
            Ok(presets) => {
                self.presets = presets;
                Ok(&self.presets)
            }
            Err(e) => Err(self.fail(EditorAction::Bootstrap, "Loading presets", e)),
        }
    }

    /// Reload the document list; selects the first document when none is selected
    pub async fn refresh_documents(&mut self) -> Result<(), ApiError> {
        self.reload_documents(true).await
    }

    async fn reload_documents(&mut self, auto_select: bool) -> Result<(), ApiError> {
        let prior = self.begin(EditorAction::ListDocuments);
        let result = self.backend.list_documents().await;
        self.finish(prior);

        let documents = result
            .map_err(|e| self.fail(EditorAction::ListDocuments, "Loading the prompt list", e))?;
        self.documents = documents;
        self.emit(EditorEvent::DocumentsListed(self.documents.clone()));

        if auto_select && self.current_document().is_none() {
            if let Some(first) = self.documents.first().cloned() {
                self.select_document(&first).await?;
            }
        }
        Ok(())
    }

    pub async fn refresh_backups(&mut self) -> Result<(), ApiError> {
        let prior = self.begin(EditorAction::ListBackups);
        let result = self.backend.list_backups().await;
        self.finish(prior);

        let backups =
            result.map_err(|e| self.fail(EditorAction::ListBackups, "Loading backups", e))?;
        self.backups = backups;
        self.emit(EditorEvent::BackupsListed(self.backups.clone()));
        Ok(())
    }

    /// Load a document into the buffer, then offer any differing local draft
    pub async fn select_document(&mut self, name: &str) -> Result<(), ApiError> {
        self.blur();
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject(EditorAction::Select, "Select a prompt file first"));
        }

        let prior = self.begin(EditorAction::Select);
        let result = self.backend.load_document(name).await;

        let content = match result {
            Ok(content) => content,
            Err(e) => {
                self.finish(prior);
                return Err(self.fail(EditorAction::Select, "Loading the prompt file", e));
            }
        };

        self.finish(EditorState::DocumentLoaded {
            name: name.to_string(),
        });
        self.replace_buffer(content);

        if let Err(e) = self.refresh_variables().await {
            tracing::debug!(document = %name, error = %e, "variables unavailable");
        }

        self.reconcile_draft(name).await;

        self.notifications.show(
            NotificationLevel::Success,
            format!("Loaded {}", name),
            None,
            Some(LOADED_NOTICE),
        );
        tracing::info!(document = %name, "prompt loaded");
        Ok(())
    }

    /// Offer the stored draft when it is non-blank and differs from the buffer.
    /// Declining keeps the draft stored.
    async fn reconcile_draft(&mut self, name: &str) -> bool {
        let draft = match self.drafts.load_draft(name) {
            Ok(Some(draft)) => draft,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(document = %name, error = %e, "could not read draft");
                return false;
            }
        };

        if !draft.should_offer(&self.buffer) {
            return false;
        }

        let prompt = ConfirmPrompt::LoadDraft {
            document: name.to_string(),
        };
        if !self.confirm.confirm(&prompt).await {
            return false;
        }

        self.replace_buffer(draft.content);
        self.notifications.show(
            NotificationLevel::Info,
            "Draft loaded",
            None,
            Some(LOADED_NOTICE),
        );
        true
    }

    pub async fn refresh_variables(&mut self) -> Result<(), ApiError> {
        let Some(name) = self.current_document().map(str::to_string) else {
            self.variables.clear();
            return Ok(());
        };

        let variables = self.backend.template_variables(&name).await?;
        self.variables = variables;
        self.emit(EditorEvent::VariablesListed(self.variables.clone()));
        Ok(())
    }

    /// Replace the buffer with user input and schedule a draft save
    pub fn edit(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
        self.schedule_draft();
    }

    /// Write the pending draft now (editor lost focus)
    pub fn flush_draft(&self) -> Result<bool, ApiError> {
        Ok(self.drafts.flush()?)
    }

    /// `{name}` placeholders in the current buffer
    pub fn buffer_variables(&self) -> Vec<String> {
        template_variables(&self.buffer)
    }

    /// Insert `{var}` at a character offset; returns the new cursor
    pub fn insert_variable(&mut self, var: &str, cursor: usize) -> usize {
        let (text, cursor) = insert_variable(&self.buffer, cursor, var);
        self.buffer = text;
        self.schedule_draft();
        self.notifications.show(
            NotificationLevel::Success,
            format!("Inserted {{{}}}", var),
            None,
            Some(SHORT_NOTICE),
        );
        cursor
    }

    pub fn format_buffer(&mut self) {
        self.buffer = format_prompt(&self.buffer);
        self.emit(EditorEvent::BufferReplaced {
            content: self.buffer.clone(),
        });
        self.schedule_draft();
        self.notifications.show(
            NotificationLevel::Success,
            "Content formatted",
            None,
            Some(SHORT_NOTICE),
        );
    }

    pub async fn create_document(&mut self, name: &str) -> Result<(), ApiError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(self.reject(EditorAction::Create, "Enter a file name"));
        }
        if !name.ends_with(".txt") {
            self.notifications.warning("File names should end with .txt");
        }

        self.blur();
        let prior = self.begin(EditorAction::Create);
        let result = self.backend.create_document(&name, "").await;
        self.finish(prior);
        result.map_err(|e| self.fail(EditorAction::Create, "Creating the file", e))?;

        self.notifications.success(format!("Created {}", name));
        tracing::info!(document = %name, "prompt created");

        self.reload_documents(false).await?;
        self.select_document(&name).await
    }

    /// Overwrite the selected document with the buffer, then drop its draft
    pub async fn save(&mut self) -> Result<ActionOutcome, ApiError> {
        let name = self.require_document(EditorAction::Save)?;

        let prompt = ConfirmPrompt::OverwriteDocument {
            document: name.clone(),
        };
        if !self.confirm.confirm(&prompt).await {
            match self.drafts.flush() {
                Ok(true) => {
                    self.notifications
                        .info(format!("Unsaved changes to {} kept as a draft", name));
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(document = %name, error = %e, "could not write pending draft"),
            }
            return Ok(ActionOutcome::Declined);
        }

        let prior = self.begin(EditorAction::Save);
        let result = self.backend.save_document(&name, &self.buffer).await;
        self.finish(prior);
        result.map_err(|e| self.fail(EditorAction::Save, "Saving", e))?;

        if let Err(e) = self.drafts.remove(&name) {
            tracing::warn!(document = %name, error = %e, "could not clear draft after save");
        }
        self.notifications.success(format!("Saved {}", name));
        tracing::info!(document = %name, "prompt saved");

        if let Err(e) = self.reload_documents(false).await {
            tracing::debug!(error = %e, "list refresh after save failed");
        }
        Ok(ActionOutcome::Completed)
    }

    /// Snapshot the buffer (saved or not) as a new backup; returns its name
    pub async fn backup(&mut self) -> Result<String, ApiError> {
        let name = self.require_document(EditorAction::Backup)?;

        let prior = self.begin(EditorAction::Backup);
        let result = self.backend.create_backup(&name, &self.buffer).await;
        self.finish(prior);
        let backup = result.map_err(|e| self.fail(EditorAction::Backup, "Saving the backup", e))?;

        self.notifications.success(format!("Backup saved as {}", backup));
        tracing::info!(document = %name, %backup, "backup created");

        if let Err(e) = self.refresh_backups().await {
            tracing::debug!(error = %e, "backup list refresh failed");
        }
        Ok(backup)
    }

    /// Put a backup's content in the buffer without saving it
    pub async fn load_backup(&mut self, backup: &str) -> Result<(), ApiError> {
        let prior = self.begin(EditorAction::LoadBackup);
        let result = self.backend.load_backup(backup).await;
        self.finish(prior);
        let content = result.map_err(|e| self.fail(EditorAction::LoadBackup, "Loading the backup", e))?;

        self.replace_buffer(content);
        self.notifications.success(format!("Loaded backup {}", backup));
        Ok(())
    }

    /// Copy a backup over the selected document and reload it
    pub async fn restore(&mut self, backup: &str) -> Result<ActionOutcome, ApiError> {
        let target = self.require_document(EditorAction::Restore)?;
        if backup.trim().is_empty() {
            return Err(self.reject(EditorAction::Restore, "Choose a backup to restore"));
        }

        let prompt = ConfirmPrompt::RestoreBackup {
            backup: backup.to_string(),
            target: target.clone(),
        };
        if !self.confirm.confirm(&prompt).await {
            return Ok(ActionOutcome::Declined);
        }

        let prior = self.begin(EditorAction::Restore);
        let result = self.backend.restore_backup(backup, &target).await;
        self.finish(prior);
        result.map_err(|e| self.fail(EditorAction::Restore, "Restoring", e))?;

        self.notifications.success(format!("Restored {} from {}", target, backup));
        tracing::info!(document = %target, %backup, "backup restored");

        self.select_document(&target).await?;
        Ok(ActionOutcome::Completed)
    }

    /// Delete the selected document and its draft
    pub async fn delete(&mut self) -> Result<ActionOutcome, ApiError> {
        let name = self.require_document(EditorAction::Delete)?;

        let prompt = ConfirmPrompt::DeleteDocument {
            document: name.clone(),
        };
        if !self.confirm.confirm(&prompt).await {
            return Ok(ActionOutcome::Declined);
        }

        self.blur();

        let prior = self.begin(EditorAction::Delete);
        let result = self.backend.delete_document(&name).await;
        if let Err(e) = result {
            self.finish(prior);
            return Err(self.fail(EditorAction::Delete, "Deleting", e));
        }

        if let Err(e) = self.drafts.remove(&name) {
            tracing::warn!(document = %name, error = %e, "could not clear draft after delete");
        }
        self.finish(EditorState::NoDocumentSelected);
        self.replace_buffer(String::new());
        self.variables.clear();

        self.notifications.success(format!("Deleted {}", name));
        tracing::info!(document = %name, "prompt deleted");

        if let Err(e) = self.reload_documents(false).await {
            tracing::debug!(error = %e, "list refresh after delete failed");
        }
        Ok(ActionOutcome::Completed)
    }

    /// Dry-run the buffer against a context and a probe message.
    /// Input is validated before any request; nothing stored is modified.
    pub async fn test(&mut self, probe: &str, context: &TestContext) -> Result<String, ApiError> {
        if self.buffer.trim().is_empty() {
            return Err(self.reject(EditorAction::Test, "Enter prompt content first"));
        }

        let context = match self.resolve_context(context) {
            Ok(context) => context,
            Err(e) => {
                return Err(self.fail(EditorAction::Test, "Checking test data", e));
            }
        };

        let probe = probe.trim();
        if probe.is_empty() {
            return Err(self.reject(EditorAction::Test, "Enter the doctor's question"));
        }

        let prior = self.begin(EditorAction::Test);
        let result = self.backend.test_prompt(&self.buffer, &context, probe).await;
        self.finish(prior);
        let output = result.map_err(|e| self.fail(EditorAction::Test, "Test", e))?;

        self.last_test_result = Some(output.clone());
        self.emit(EditorEvent::TestResult(output.clone()));
        self.notifications.success("Test finished");
        Ok(output)
    }

    /// Mark the selected document as the one new sessions use
    pub async fn use_as_current(&mut self) -> Result<(), ApiError> {
        let name = self.require_document(EditorAction::Select)?;
        self.backend
            .set_current_document(&name)
            .await
            .map_err(|e| self.fail(EditorAction::Select, "Setting the current prompt", e))?;
        self.notifications.success(format!("{} is now the active prompt", name));
        Ok(())
    }

    fn resolve_context(&self, context: &TestContext) -> Result<Value, ApiError> {
        match context {
            TestContext::Preset(filename) => {
                let filename = filename.trim();
                if filename.is_empty() {
                    return Err(ApiError::validation("Select a preset case"));
                }
                self.presets
                    .iter()
                    .find(|p| p.filename == filename)
                    .and_then(|p| p.data.clone())
                    .ok_or_else(|| ApiError::validation(format!("Preset {} has no usable data", filename)))
            }
            TestContext::Custom(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ApiError::validation("Enter custom test data"));
                }
                serde_json::from_str(text)
                    .map_err(|e| ApiError::validation(format!("Test data is not valid JSON: {}", e)))
            }
        }
    }

    fn require_document(&self, action: EditorAction) -> Result<String, ApiError> {
        match self.current_document() {
            Some(name) => Ok(name.to_string()),
            None => Err(self.reject(action, "Select a prompt file first")),
        }
    }

    fn schedule_draft(&self) {
        if let Some(name) = self.current_document() {
            if let Err(e) = self.drafts.schedule_save(name, &self.buffer) {
                tracing::warn!(document = %name, error = %e, "could not schedule draft save");
            }
        }
    }

    /// The buffer is about to change hands; persist the pending edit first
    fn blur(&self) {
        if let Err(e) = self.drafts.flush() {
            tracing::warn!(error = %e, "could not write pending draft");
        }
    }

    fn replace_buffer(&mut self, content: String) {
        self.buffer = content;
        self.emit(EditorEvent::BufferReplaced {
            content: self.buffer.clone(),
        });
    }

    /// Enter `Busy`; returns the state to restore afterwards
    fn begin(&mut self, action: EditorAction) -> EditorState {
        let prior = self.state.clone();
        self.loading.show();
        self.set_state(EditorState::Busy {
            action,
            resume: Box::new(prior.clone()),
        });
        prior
    }

    fn finish(&mut self, next: EditorState) {
        self.loading.hide();
        self.set_state(next);
    }

    fn set_state(&mut self, state: EditorState) {
        if self.state != state {
            self.state = state;
            self.emit(EditorEvent::StateChanged(self.state.clone()));
        }
    }

    /// Missing input: warn and fail without touching the server
    fn reject(&self, action: EditorAction, message: &str) -> ApiError {
        self.notifications.warning(message);
        let err = ApiError::validation(message);
        self.emit_failure(action, &err);
        err
    }

    fn fail(&self, action: EditorAction, what: &str, err: ApiError) -> ApiError {
        self.notifications.error(format!("{} failed: {}", what, err));
        tracing::warn!(?action, error = %err, "editor action failed");
        self.emit_failure(action, &err);
        err
    }

    fn emit_failure(&self, action: EditorAction, err: &ApiError) {
        self.emit(EditorEvent::Failed {
            action,
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    fn emit(&self, event: EditorEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
