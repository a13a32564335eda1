use async_trait::async_trait;
use serde_json::{json, Value};

use super::http_client::ApiClient;
use super::types::*;
use crate::error::ApiError;

/// Service-wide endpoints shared by the editor and the session app
#[async_trait]
pub trait ServiceBackend: Send + Sync {
    async fn health(&self) -> Result<Health, ApiError>;
    async fn presets(&self) -> Result<Vec<Preset>, ApiError>;
}

/// Prompt documents, backups and dry-run rendering
#[async_trait]
pub trait PromptBackend: ServiceBackend {
    async fn list_documents(&self) -> Result<Vec<String>, ApiError>;
    async fn load_document(&self, name: &str) -> Result<String, ApiError>;
    async fn save_document(&self, name: &str, content: &str) -> Result<(), ApiError>;
    async fn create_document(&self, name: &str, content: &str) -> Result<(), ApiError>;
    async fn delete_document(&self, name: &str) -> Result<(), ApiError>;
    async fn list_backups(&self) -> Result<Vec<String>, ApiError>;
    /// Returns the name the server gave the new backup
    async fn create_backup(&self, name: &str, content: &str) -> Result<String, ApiError>;
    async fn load_backup(&self, backup: &str) -> Result<String, ApiError>;
    async fn restore_backup(&self, backup: &str, target: &str) -> Result<(), ApiError>;
    async fn template_variables(&self, name: &str) -> Result<Vec<String>, ApiError>;
    async fn test_prompt(
        &self,
        content: &str,
        context: &Value,
        probe: &str,
    ) -> Result<String, ApiError>;
    async fn current_document(&self) -> Result<String, ApiError>;
    async fn set_current_document(&self, name: &str) -> Result<(), ApiError>;
}

/// SP chat sessions, scoring and exam reports
#[async_trait]
pub trait SessionBackend: ServiceBackend {
    async fn create_session(&self, request: &CreateSessionRequest) -> Result<CreatedSession, ApiError>;
    async fn list_sessions(&self) -> Result<SessionList, ApiError>;
    async fn session_info(&self, id: &str) -> Result<Value, ApiError>;
    async fn session_history(&self, id: &str) -> Result<ChatHistory, ApiError>;
    async fn delete_session(&self, id: &str) -> Result<Value, ApiError>;
    async fn chat(&self, id: &str, message: &str) -> Result<ChatReply, ApiError>;
    async fn validate_data(&self, data: &Value) -> Result<Value, ApiError>;
    async fn exam_report(&self, id: &str) -> Result<Value, ApiError>;
    async fn score_report(&self, id: &str) -> Result<Value, ApiError>;
    async fn score_summary(&self, id: &str) -> Result<Value, ApiError>;
    async fn score_suggestions(&self, id: &str) -> Result<Value, ApiError>;
    async fn export_session(&self, id: &str) -> Result<Value, ApiError>;
    async fn scoring_config(&self, id: &str) -> Result<Value, ApiError>;
    async fn update_scoring_config(&self, id: &str, threshold: f64) -> Result<Value, ApiError>;
    async fn scoring_stats(&self) -> Result<Value, ApiError>;
}

#[async_trait]
impl ServiceBackend for ApiClient {
    async fn health(&self) -> Result<Health, ApiError> {
        self.get(&["health"]).await
    }

    async fn presets(&self) -> Result<Vec<Preset>, ApiError> {
        self.get(&["sp", "presets"]).await
    }
}

#[async_trait]
impl PromptBackend for ApiClient {
    async fn list_documents(&self) -> Result<Vec<String>, ApiError> {
        self.get(&["prompt", "list"]).await
    }

    async fn load_document(&self, name: &str) -> Result<String, ApiError> {
        self.get_with_query(&["prompt", "load"], &[("filename", name)])
            .await
    }

    async fn save_document(&self, name: &str, content: &str) -> Result<(), ApiError> {
        let body = DocumentBody { filename: name, content: Some(content) };
        self.post::<Value, _>(&["prompt", "save"], &body).await?;
        Ok(())
    }

    async fn create_document(&self, name: &str, content: &str) -> Result<(), ApiError> {
        let body = DocumentBody { filename: name, content: Some(content) };
        self.post::<Value, _>(&["prompt", "create"], &body).await?;
        Ok(())
    }

    async fn delete_document(&self, name: &str) -> Result<(), ApiError> {
        let body = DocumentBody { filename: name, content: None };
        self.post::<Value, _>(&["prompt", "delete"], &body).await?;
        Ok(())
    }

    async fn list_backups(&self) -> Result<Vec<String>, ApiError> {
        self.get(&["prompt", "backups"]).await
    }

    async fn create_backup(&self, name: &str, content: &str) -> Result<String, ApiError> {
        let body = DocumentBody { filename: name, content: Some(content) };
        self.post(&["prompt", "backup"], &body).await
    }

    async fn load_backup(&self, backup: &str) -> Result<String, ApiError> {
        self.get_with_query(&["prompt", "backup_load"], &[("filename", backup)])
            .await
    }

    async fn restore_backup(&self, backup: &str, target: &str) -> Result<(), ApiError> {
        let body = RestoreBody {
            backup_filename: backup,
            target_filename: target,
        };
        self.post::<Value, _>(&["prompt", "restore"], &body).await?;
        Ok(())
    }

    async fn template_variables(&self, name: &str) -> Result<Vec<String>, ApiError> {
        self.get_with_query(&["prompt", "vars"], &[("filename", name)])
            .await
    }

    async fn test_prompt(
        &self,
        content: &str,
        context: &Value,
        probe: &str,
    ) -> Result<String, ApiError> {
        let body = TestBody {
            prompt_content: content,
            context,
            doctor_message: probe,
        };
        let data: Value = self.post(&["prompt", "test"], &body).await?;
        // The render result is shown verbatim; non-string payloads are pretty-printed
        Ok(match data {
            Value::String(text) => text,
            other => serde_json::to_string_pretty(&other).unwrap_or_default(),
        })
    }

    async fn current_document(&self) -> Result<String, ApiError> {
        self.get(&["prompt", "current"]).await
    }

    async fn set_current_document(&self, name: &str) -> Result<(), ApiError> {
        let body = DocumentBody { filename: name, content: None };
        self.post::<Value, _>(&["prompt", "set_current"], &body).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for ApiClient {
    async fn create_session(&self, request: &CreateSessionRequest) -> Result<CreatedSession, ApiError> {
        self.post(&["sp", "session", "create"], request).await
    }

    async fn list_sessions(&self) -> Result<SessionList, ApiError> {
        self.get(&["sp", "sessions"]).await
    }

    async fn session_info(&self, id: &str) -> Result<Value, ApiError> {
        self.get(&["sp", "session", id, "info"]).await
    }

    async fn session_history(&self, id: &str) -> Result<ChatHistory, ApiError> {
        self.get(&["sp", "session", id, "history"]).await
    }

    async fn delete_session(&self, id: &str) -> Result<Value, ApiError> {
        self.delete(&["sp", "session", id]).await
    }

    async fn chat(&self, id: &str, message: &str) -> Result<ChatReply, ApiError> {
        self.post(&["sp", "session", id, "chat"], &ChatBody { message })
            .await
    }

    async fn validate_data(&self, data: &Value) -> Result<Value, ApiError> {
        self.post(&["sp", "data", "validate"], data).await
    }

    async fn exam_report(&self, id: &str) -> Result<Value, ApiError> {
        self.get(&["sp", "session", id, "exam_report"]).await
    }

    async fn score_report(&self, id: &str) -> Result<Value, ApiError> {
        self.get(&["scoring", "report", id]).await
    }

    async fn score_summary(&self, id: &str) -> Result<Value, ApiError> {
        self.get(&["scoring", "summary", id]).await
    }

    async fn score_suggestions(&self, id: &str) -> Result<Value, ApiError> {
        self.get(&["scoring", "suggestions", id]).await
    }

    async fn export_session(&self, id: &str) -> Result<Value, ApiError> {
        self.get(&["scoring", "export", id]).await
    }

    async fn scoring_config(&self, id: &str) -> Result<Value, ApiError> {
        self.get(&["scoring", "config", id]).await
    }

    async fn update_scoring_config(&self, id: &str, threshold: f64) -> Result<Value, ApiError> {
        self.post(&["scoring", "config", id], &json!({ "threshold": threshold }))
            .await
    }

    async fn scoring_stats(&self) -> Result<Value, ApiError> {
        self.get(&["scoring", "stats"]).await
    }
}
