use serde_json::Value;
use std::sync::Arc;

use super::types::*;
use crate::api::{ChatHistory, ChatReply, CreateSessionRequest, CreatedSession, SessionBackend};
use crate::confirm::{Confirm, ConfirmPrompt};
use crate::editor::ActionOutcome;
use crate::error::ApiError;
use crate::monitor::ConnectionStatus;
use crate::ui::{LoadingIndicator, NotificationCenter};

/// Standardized-patient session surface: session list, current session,
/// chat and the report endpoints that hang off a session.
pub struct SessionController<B: SessionBackend + ?Sized> {
    backend: Arc<B>,
    confirm: Arc<dyn Confirm>,
    notifications: Arc<NotificationCenter>,
    loading: Arc<LoadingIndicator>,
    context: AppContext,
}

impl<B: SessionBackend + ?Sized> SessionController<B> {
    pub fn new(
        backend: Arc<B>,
        confirm: Arc<dyn Confirm>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            backend,
            confirm,
            notifications,
            loading: Arc::new(LoadingIndicator::new()),
            context: AppContext::default(),
        }
    }

    pub fn with_loading(mut self, loading: Arc<LoadingIndicator>) -> Self {
        self.loading = loading;
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Health, presets, then the session list. Every step runs.
    pub async fn bootstrap(&mut self) -> Result<(), ApiError> {
        let mut first_error = None;

        self.check_connection().await;

        if let Err(e) = self.load_presets().await {
            first_error.get_or_insert(e);
        }
        if let Err(e) = self.refresh_sessions().await {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn check_connection(&mut self) -> bool {
        match self.backend.health().await {
            Ok(health) => {
                self.context.connected = true;
                self.context.active_sessions = health.active_sessions;
            }
            Err(e) => {
                tracing::warn!(error = %e, "health check failed");
                self.context.connected = false;
                self.notifications.error("Cannot reach the SP service");
            }
        }
        self.context.connected
    }

    pub async fn load_presets(&mut self) -> Result<(), ApiError> {
        let presets = self
            .backend
            .presets()
            .await
            .map_err(|e| self.fail("Loading presets", e))?;
        self.context.presets = presets;
        Ok(())
    }

    /// Replace the session list; a vanished current session is cleared
    pub async fn refresh_sessions(&mut self) -> Result<(), ApiError> {
        self.loading.show();
        let result = self.backend.list_sessions().await;
        self.loading.hide();

        let list = result.map_err(|e| self.fail("Loading sessions", e))?;
        self.context.active_sessions = list.total_sessions;
        self.context.replace_sessions(list.sessions);
        Ok(())
    }

    /// Create a session from a preset or custom JSON and make it current
    pub async fn create_session(
        &mut self,
        id: &str,
        source: &SessionSource,
    ) -> Result<CreatedSession, ApiError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(self.reject("Enter a session ID"));
        }

        let request = match source {
            SessionSource::Preset(filename) => {
                let filename = filename.trim();
                if filename.is_empty() {
                    return Err(self.reject("Select a preset case"));
                }
                CreateSessionRequest {
                    session_id: id.to_string(),
                    preset_file: Some(filename.to_string()),
                    custom_data: None,
                }
            }
            SessionSource::Custom(text) => CreateSessionRequest {
                session_id: id.to_string(),
                preset_file: None,
                custom_data: Some(self.parse_case(text)?),
            },
        };

        self.loading.show();
        let result = self.backend.create_session(&request).await;
        self.loading.hide();
        let created = result.map_err(|e| self.fail("Creating the session", e))?;

        self.notifications.success(format!(
            "Session {} created for {}",
            created.session_id, created.patient_name
        ));
        tracing::info!(session = %created.session_id, "session created");

        self.refresh_sessions().await?;
        self.select_session(&created.session_id);
        Ok(created)
    }

    /// Make a listed session current; unknown ids are ignored
    pub fn select_session(&mut self, id: &str) -> bool {
        match self.context.find(id).cloned() {
            Some(session) => {
                self.context.current_session = Some(session);
                true
            }
            None => false,
        }
    }

    pub async fn send_message(&mut self, text: &str) -> Result<ChatReply, ApiError> {
        let id = self.require_session()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject("Enter a message"));
        }

        self.loading.show();
        let result = self.backend.chat(&id, text).await;
        self.loading.hide();
        let reply = result.map_err(|e| self.fail("Sending the message", e))?;

        let count = reply.message_count;
        if let Some(current) = self.context.current_session.as_mut() {
            current.message_count = count;
        }
        if let Some(listed) = self.context.sessions.iter_mut().find(|s| s.session_id == id) {
            listed.message_count = count;
        }
        Ok(reply)
    }

    pub async fn session_info(&self) -> Result<Value, ApiError> {
        let id = self.require_session()?;
        self.backend
            .session_info(&id)
            .await
            .map_err(|e| self.fail("Loading session info", e))
    }

    pub async fn history(&self) -> Result<ChatHistory, ApiError> {
        let id = self.require_session()?;
        self.backend
            .session_history(&id)
            .await
            .map_err(|e| self.fail("Loading the chat history", e))
    }

    pub async fn exam_report(&self) -> Result<Value, ApiError> {
        let id = self.require_session()?;
        self.backend
            .exam_report(&id)
            .await
            .map_err(|e| self.fail("Loading the exam report", e))
    }

    pub async fn score_report(&self) -> Result<Value, ApiError> {
        let id = self.require_session()?;
        self.backend
            .score_report(&id)
            .await
            .map_err(|e| self.fail("Loading the score report", e))
    }

    pub async fn score_summary(&self) -> Result<Value, ApiError> {
        let id = self.require_session()?;
        self.backend
            .score_summary(&id)
            .await
            .map_err(|e| self.fail("Loading the score summary", e))
    }

    pub async fn score_suggestions(&self) -> Result<Value, ApiError> {
        let id = self.require_session()?;
        self.backend
            .score_suggestions(&id)
            .await
            .map_err(|e| self.fail("Loading suggestions", e))
    }

    pub async fn export_session(&self) -> Result<Value, ApiError> {
        let id = self.require_session()?;
        self.backend
            .export_session(&id)
            .await
            .map_err(|e| self.fail("Exporting the session", e))
    }

    /// Delete the current session after confirmation
    pub async fn delete_current(&mut self) -> Result<ActionOutcome, ApiError> {
        let Some(current) = self.context.current_session.clone() else {
            return Err(self.reject("Select a session first"));
        };

        let prompt = ConfirmPrompt::DeleteSession {
            session_id: current.session_id.clone(),
            patient_name: current.patient_name.clone(),
        };
        if !self.confirm.confirm(&prompt).await {
            return Ok(ActionOutcome::Declined);
        }

        self.loading.show();
        let result = self.backend.delete_session(&current.session_id).await;
        self.loading.hide();
        result.map_err(|e| self.fail("Deleting the session", e))?;

        self.context.current_session = None;
        self.notifications
            .success(format!("Session {} deleted", current.session_id));
        tracing::info!(session = %current.session_id, "session deleted");

        self.refresh_sessions().await?;
        Ok(ActionOutcome::Completed)
    }

    /// Check case JSON locally, then against the server's required fields
    pub async fn validate_data(&self, text: &str) -> Result<Value, ApiError> {
        let data = self.parse_case(text)?;
        self.backend
            .validate_data(&data)
            .await
            .map_err(|e| self.fail("Validating patient data", e))
    }

    /// Fold a monitor poll into the context. Polls are applied in arrival
    /// order, so a slow poll can overwrite a fresher refresh.
    pub fn apply_status(&mut self, status: &ConnectionStatus) {
        self.context.connected = status.connected;
        if !status.connected {
            return;
        }
        self.context.active_sessions = status.active_sessions;
        if let Some(list) = &status.sessions {
            self.context.replace_sessions(list.sessions.clone());
        }
    }

    fn parse_case(&self, text: &str) -> Result<Value, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject("Enter patient data"));
        }
        serde_json::from_str(text).map_err(|e| {
            let err = ApiError::validation(format!("Patient data is not valid JSON: {}", e));
            self.notifications.error(err.to_string());
            err
        })
    }

    fn require_session(&self) -> Result<String, ApiError> {
        match self.context.current_id() {
            Some(id) => Ok(id.to_string()),
            None => Err(self.reject("Select a session first")),
        }
    }

    fn reject(&self, message: &str) -> ApiError {
        self.notifications.warning(message);
        ApiError::validation(message)
    }

    fn fail(&self, what: &str, err: ApiError) -> ApiError {
        tracing::warn!(error = %err, "{} failed", what);
        self.notifications.error(format!("{} failed: {}", what, err));
        err
    }
}
