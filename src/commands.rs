use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::{
    ApiClient, ChatHistory, ChatReply, CreatedSession, Health, Preset, PromptBackend,
    ServiceBackend, SessionBackend, SessionSummary,
};
use crate::config::{Settings, SettingsError};
use crate::confirm::Confirm;
use crate::database::{Database, DbError};
use crate::drafts::{Draft, DraftStore};
use crate::editor::{ActionOutcome, EditorController, EditorEvent, TestContext};
use crate::error::ApiError;
use crate::monitor::{ConnectionMonitor, PollTarget};
use crate::session::{SessionController, SessionSource};
use crate::ui::{LoadingIndicator, NotificationCenter};

pub struct AppState {
    pub db: Arc<Database>,
    pub client: Arc<ApiClient>,
    pub settings: Settings,
    pub notifications: Arc<NotificationCenter>,
    pub loading: Arc<LoadingIndicator>,
    pub confirm: Arc<dyn Confirm>,
    pub editor_events: Option<UnboundedSender<EditorEvent>>,
}

#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        CommandError {
            message: message.into(),
        }
    }
}

impl From<DbError> for CommandError {
    fn from(e: DbError) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<ApiError> for CommandError {
    fn from(e: ApiError) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<SettingsError> for CommandError {
    fn from(e: SettingsError) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError {
            message: e.to_string(),
        }
    }
}

impl AppState {
    pub fn new(
        db: Database,
        settings: Settings,
        confirm: Arc<dyn Confirm>,
    ) -> Result<Self, CommandError> {
        let client = ApiClient::new(&settings.base_url, settings.request_timeout())?;
        let notifications = Arc::new(NotificationCenter::new(settings.notification_duration()));

        Ok(Self {
            db: Arc::new(db),
            client: Arc::new(client),
            settings,
            notifications,
            loading: Arc::new(LoadingIndicator::new()),
            confirm,
            editor_events: None,
        })
    }

    pub fn with_editor_events(mut self, events: UnboundedSender<EditorEvent>) -> Self {
        self.editor_events = Some(events);
        self
    }

    pub fn drafts(&self) -> DraftStore {
        DraftStore::new(self.db.clone(), self.settings.draft_delay())
    }

    pub fn editor(&self) -> EditorController<ApiClient> {
        let editor = EditorController::new(
            self.client.clone(),
            self.drafts(),
            self.confirm.clone(),
            self.notifications.clone(),
        )
        .with_loading(self.loading.clone());

        match &self.editor_events {
            Some(events) => editor.with_events(events.clone()),
            None => editor,
        }
    }

    pub fn sessions(&self) -> SessionController<ApiClient> {
        SessionController::new(
            self.client.clone(),
            self.confirm.clone(),
            self.notifications.clone(),
        )
        .with_loading(self.loading.clone())
    }

    pub fn monitor(&self, target: PollTarget) -> ConnectionMonitor<ApiClient> {
        let interval = match target {
            PollTarget::Health => self.settings.editor_poll_interval(),
            PollTarget::HealthAndSessions => self.settings.session_poll_interval(),
        };
        ConnectionMonitor::new(self.client.clone(), target, interval)
    }
}

// Settings commands
pub fn get_settings(state: &AppState) -> Result<Settings, CommandError> {
    Ok(state.db.get_settings()?)
}

pub fn set_setting(state: &AppState, key: &str, value: &str) -> Result<Settings, CommandError> {
    let mut settings = state.db.get_settings()?;
    settings.set(key, value)?;
    state.db.save_settings(&settings)?;
    tracing::info!(%key, "setting updated");
    Ok(settings)
}

// Service commands
pub async fn health(state: &AppState) -> Result<Health, CommandError> {
    Ok(state.client.health().await?)
}

pub async fn list_presets(state: &AppState) -> Result<Vec<Preset>, CommandError> {
    Ok(state.client.presets().await?)
}

// Prompt commands
pub async fn prompt_list(state: &AppState) -> Result<Vec<String>, CommandError> {
    Ok(state.client.list_documents().await?)
}

/// Load a document (offering its draft) and return the editor buffer
pub async fn prompt_show(state: &AppState, name: &str) -> Result<String, CommandError> {
    let mut editor = state.editor();
    editor.select_document(name).await?;
    Ok(editor.buffer().to_string())
}

pub async fn prompt_create(state: &AppState, name: &str) -> Result<(), CommandError> {
    let mut editor = state.editor();
    editor.create_document(name).await?;
    Ok(())
}

/// Keep new content as the document's local draft without saving it
pub async fn prompt_edit(state: &AppState, name: &str, content: String) -> Result<Draft, CommandError> {
    let mut editor = state.editor();
    editor.select_document(name).await?;
    editor.edit(content);
    editor.flush_draft()?;

    state
        .db
        .get_draft(name)?
        .ok_or_else(|| CommandError::new(format!("No draft stored for {}", name)))
}

/// Save `content`, or whatever the editor holds after draft reconciliation
pub async fn prompt_save(
    state: &AppState,
    name: &str,
    content: Option<String>,
) -> Result<ActionOutcome, CommandError> {
    let mut editor = state.editor();
    editor.select_document(name).await?;
    if let Some(content) = content {
        editor.edit(content);
    }
    Ok(editor.save().await?)
}

pub async fn prompt_delete(state: &AppState, name: &str) -> Result<ActionOutcome, CommandError> {
    let mut editor = state.editor();
    editor.select_document(name).await?;
    Ok(editor.delete().await?)
}

pub async fn prompt_backups(state: &AppState) -> Result<Vec<String>, CommandError> {
    Ok(state.client.list_backups().await?)
}

pub async fn prompt_backup(state: &AppState, name: &str) -> Result<String, CommandError> {
    let mut editor = state.editor();
    editor.select_document(name).await?;
    Ok(editor.backup().await?)
}

pub async fn prompt_backup_show(state: &AppState, backup: &str) -> Result<String, CommandError> {
    let mut editor = state.editor();
    editor.load_backup(backup).await?;
    Ok(editor.buffer().to_string())
}

pub async fn prompt_restore(
    state: &AppState,
    backup: &str,
    target: &str,
) -> Result<ActionOutcome, CommandError> {
    let mut editor = state.editor();
    editor.select_document(target).await?;
    Ok(editor.restore(backup).await?)
}

pub async fn prompt_vars(state: &AppState, name: &str) -> Result<Vec<String>, CommandError> {
    let mut editor = state.editor();
    editor.select_document(name).await?;
    Ok(editor.variables().to_vec())
}

pub async fn prompt_test(
    state: &AppState,
    name: &str,
    message: &str,
    context: TestContext,
) -> Result<String, CommandError> {
    let mut editor = state.editor();
    if matches!(context, TestContext::Preset(_)) {
        editor.load_presets().await?;
    }
    editor.select_document(name).await?;
    Ok(editor.test(message, &context).await?)
}

/// Tidy whitespace and keep the result as a draft
pub async fn prompt_format(state: &AppState, name: &str) -> Result<String, CommandError> {
    let mut editor = state.editor();
    editor.select_document(name).await?;
    editor.format_buffer();
    editor.flush_draft()?;
    Ok(editor.buffer().to_string())
}

pub fn prompt_draft(state: &AppState, name: &str) -> Result<Option<Draft>, CommandError> {
    Ok(state.drafts().load_draft(name)?)
}

pub fn prompt_discard_draft(state: &AppState, name: &str) -> Result<bool, CommandError> {
    Ok(state.drafts().remove(name)?)
}

pub fn list_drafts(state: &AppState) -> Result<Vec<Draft>, CommandError> {
    Ok(state.drafts().list()?)
}

pub async fn prompt_current(state: &AppState) -> Result<String, CommandError> {
    Ok(state.client.current_document().await?)
}

pub async fn prompt_use(state: &AppState, name: &str) -> Result<(), CommandError> {
    let mut editor = state.editor();
    editor.select_document(name).await?;
    editor.use_as_current().await?;
    Ok(())
}

// Session commands
async fn open_session(state: &AppState, id: &str) -> Result<SessionController<ApiClient>, CommandError> {
    let mut sessions = state.sessions();
    sessions.refresh_sessions().await?;
    if !sessions.select_session(id) {
        return Err(CommandError::new(format!("Session {} not found", id)));
    }
    Ok(sessions)
}

pub async fn session_list(state: &AppState) -> Result<Vec<SessionSummary>, CommandError> {
    let mut sessions = state.sessions();
    sessions.refresh_sessions().await?;
    Ok(sessions.context().sessions.clone())
}

pub async fn session_create(
    state: &AppState,
    id: &str,
    source: SessionSource,
) -> Result<CreatedSession, CommandError> {
    let mut sessions = state.sessions();
    Ok(sessions.create_session(id, &source).await?)
}

pub async fn session_chat(state: &AppState, id: &str, message: &str) -> Result<ChatReply, CommandError> {
    let mut sessions = open_session(state, id).await?;
    Ok(sessions.send_message(message).await?)
}

pub async fn session_info(state: &AppState, id: &str) -> Result<Value, CommandError> {
    Ok(open_session(state, id).await?.session_info().await?)
}

pub async fn session_history(state: &AppState, id: &str) -> Result<ChatHistory, CommandError> {
    Ok(open_session(state, id).await?.history().await?)
}

pub async fn session_delete(state: &AppState, id: &str) -> Result<ActionOutcome, CommandError> {
    let mut sessions = open_session(state, id).await?;
    Ok(sessions.delete_current().await?)
}

pub async fn session_report(state: &AppState, id: &str) -> Result<Value, CommandError> {
    Ok(open_session(state, id).await?.score_report().await?)
}

pub async fn session_summary(state: &AppState, id: &str) -> Result<Value, CommandError> {
    Ok(open_session(state, id).await?.score_summary().await?)
}

pub async fn session_suggestions(state: &AppState, id: &str) -> Result<Value, CommandError> {
    Ok(open_session(state, id).await?.score_suggestions().await?)
}

pub async fn session_exam(state: &AppState, id: &str) -> Result<Value, CommandError> {
    Ok(open_session(state, id).await?.exam_report().await?)
}

pub async fn session_export(state: &AppState, id: &str) -> Result<Value, CommandError> {
    Ok(open_session(state, id).await?.export_session().await?)
}

pub async fn session_validate(state: &AppState, data: &str) -> Result<Value, CommandError> {
    Ok(state.sessions().validate_data(data).await?)
}

// Scoring commands
pub async fn scoring_config(state: &AppState, id: &str) -> Result<Value, CommandError> {
    Ok(state.client.scoring_config(id).await?)
}

pub async fn set_scoring_threshold(state: &AppState, id: &str, threshold: f64) -> Result<Value, CommandError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(CommandError::new("Threshold must be between 0 and 1"));
    }
    Ok(state.client.update_scoring_config(id, threshold).await?)
}

pub async fn scoring_stats(state: &AppState) -> Result<Value, CommandError> {
    Ok(state.client.scoring_stats().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::AutoConfirm;
    use std::time::Duration;

    fn state() -> AppState {
        AppState::new(
            Database::open_in_memory().unwrap(),
            Settings::default(),
            Arc::new(AutoConfirm(true)),
        )
        .unwrap()
    }

    #[test]
    fn test_command_error_from_api_error() {
        let err: CommandError = ApiError::Application("文件不存在".into()).into();
        assert_eq!(err.to_string(), "文件不存在");
        assert_eq!(serde_json::to_value(&err).unwrap()["message"], "文件不存在");
    }

    #[test]
    fn test_set_setting_persists() {
        let state = state();

        let settings = set_setting(&state, "draft_delay_ms", "250").unwrap();

        assert_eq!(settings.draft_delay_ms, 250);
        assert_eq!(get_settings(&state).unwrap().draft_delay_ms, 250);
    }

    #[test]
    fn test_set_unknown_setting_fails() {
        let state = state();
        assert!(set_setting(&state, "colour", "blue").is_err());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let settings = Settings {
            base_url: "not a url".into(),
            ..Default::default()
        };
        let result = AppState::new(
            Database::open_in_memory().unwrap(),
            settings,
            Arc::new(AutoConfirm(true)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_drafts_are_local() {
        let state = state();
        state.db.save_draft("a.txt", "local").unwrap();

        assert_eq!(prompt_draft(&state, "a.txt").unwrap().unwrap().content, "local");
        assert_eq!(list_drafts(&state).unwrap().len(), 1);
        assert!(prompt_discard_draft(&state, "a.txt").unwrap());
        assert!(prompt_draft(&state, "a.txt").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_threshold_range_checked_before_request() {
        let state = state();
        let err = set_scoring_threshold(&state, "s1", 1.5).await.unwrap_err();
        assert_eq!(err.to_string(), "Threshold must be between 0 and 1");
    }

    #[test]
    fn test_monitor_interval_follows_settings() {
        let state = state();
        assert_eq!(state.monitor(PollTarget::Health).interval(), Duration::from_secs(10));
        assert_eq!(
            state.monitor(PollTarget::HealthAndSessions).interval(),
            Duration::from_secs(30)
        );
    }
}
