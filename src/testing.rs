//! In-memory stand-in for the SP API used by controller tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::api::{
    ChatHistory, ChatReply, CreateSessionRequest, CreatedSession, Health, HistoryEntry, Preset,
    PromptBackend, ServiceBackend, SessionBackend, SessionList, SessionSummary,
};
use crate::error::ApiError;

#[derive(Debug, Clone)]
struct FakeSession {
    summary: SessionSummary,
    data: Value,
    history: Vec<HistoryEntry>,
}

#[derive(Default)]
pub struct FakeBackend {
    documents: Mutex<BTreeMap<String, String>>,
    backups: Mutex<BTreeMap<String, String>>,
    sessions: Mutex<BTreeMap<String, FakeSession>>,
    presets: Mutex<Vec<Preset>>,
    calls: Mutex<Vec<String>>,
    backup_seq: AtomicU32,
    offline: AtomicBool,
    fail_next: Mutex<Option<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, name: &str, content: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
        self
    }

    pub fn with_backup(self, name: &str, content: &str) -> Self {
        self.backups
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
        self
    }

    pub fn with_preset(self, filename: &str, name: &str, data: Option<Value>) -> Self {
        self.presets.lock().unwrap().push(Preset {
            filename: filename.to_string(),
            name: Some(name.to_string()),
            disease: Some("感冒".to_string()),
            symptoms: Vec::new(),
            description: format!("{} - 感冒", name),
            data,
        });
        self
    }

    pub fn document(&self, name: &str) -> Option<String> {
        self.documents.lock().unwrap().get(name).cloned()
    }

    pub fn backup(&self, name: &str) -> Option<String> {
        self.backups.lock().unwrap().get(name).cloned()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    /// Simulate another client removing a session behind our back
    pub fn drop_session(&self, id: &str) {
        self.sessions.lock().unwrap().remove(id);
    }

    fn enter(&self, call: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(ApiError::Application(message));
        }
        Ok(())
    }

    fn next_backup_name(&self, name: &str, tag: &str) -> String {
        let seq = self.backup_seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}_{}{}.txt", name.replace(".txt", ""), tag, seq)
    }

    fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut FakeSession) -> T,
    ) -> Result<T, ApiError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .get_mut(id)
            .map(f)
            .ok_or_else(|| ApiError::Application(format!("会话 {} 不存在", id)))
    }
}

#[async_trait]
impl ServiceBackend for FakeBackend {
    async fn health(&self) -> Result<Health, ApiError> {
        self.enter("health")?;
        Ok(Health {
            status: Some("running".to_string()),
            active_sessions: self.sessions.lock().unwrap().len() as u32,
            ..Default::default()
        })
    }

    async fn presets(&self) -> Result<Vec<Preset>, ApiError> {
        self.enter("presets")?;
        Ok(self.presets.lock().unwrap().clone())
    }
}

#[async_trait]
impl PromptBackend for FakeBackend {
    async fn list_documents(&self) -> Result<Vec<String>, ApiError> {
        self.enter("list_documents")?;
        Ok(self
            .documents
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.ends_with(".txt"))
            .cloned()
            .collect())
    }

    async fn load_document(&self, name: &str) -> Result<String, ApiError> {
        self.enter("load_document")?;
        self.document(name)
            .ok_or_else(|| ApiError::Application("文件不存在".to_string()))
    }

    async fn save_document(&self, name: &str, content: &str) -> Result<(), ApiError> {
        self.enter("save_document")?;
        let previous = self
            .document(name)
            .ok_or_else(|| ApiError::Application("文件不存在".to_string()))?;
        let before = self.next_backup_name(name, "before_");
        self.backups.lock().unwrap().insert(before, previous);
        self.documents
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn create_document(&self, name: &str, content: &str) -> Result<(), ApiError> {
        self.enter("create_document")?;
        let mut documents = self.documents.lock().unwrap();
        if documents.contains_key(name) {
            return Err(ApiError::Application("文件已存在".to_string()));
        }
        documents.insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn delete_document(&self, name: &str) -> Result<(), ApiError> {
        self.enter("delete_document")?;
        self.documents
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ApiError::Application("文件不存在".to_string()))
    }

    async fn list_backups(&self) -> Result<Vec<String>, ApiError> {
        self.enter("list_backups")?;
        Ok(self.backups.lock().unwrap().keys().cloned().collect())
    }

    async fn create_backup(&self, name: &str, content: &str) -> Result<String, ApiError> {
        self.enter("create_backup")?;
        let backup = self.next_backup_name(name, "");
        self.backups
            .lock()
            .unwrap()
            .insert(backup.clone(), content.to_string());
        Ok(backup)
    }

    async fn load_backup(&self, backup: &str) -> Result<String, ApiError> {
        self.enter("load_backup")?;
        self.backup(backup)
            .ok_or_else(|| ApiError::Application("副本不存在".to_string()))
    }

    async fn restore_backup(&self, backup: &str, target: &str) -> Result<(), ApiError> {
        self.enter("restore_backup")?;
        let content = self
            .backup(backup)
            .ok_or_else(|| ApiError::Application("副本不存在".to_string()))?;
        self.documents
            .lock()
            .unwrap()
            .insert(target.to_string(), content);
        Ok(())
    }

    async fn template_variables(&self, name: &str) -> Result<Vec<String>, ApiError> {
        self.enter("template_variables")?;
        let content = self
            .document(name)
            .ok_or_else(|| ApiError::Application("文件不存在".to_string()))?;
        Ok(crate::editor::template_variables(&content))
    }

    async fn test_prompt(
        &self,
        content: &str,
        context: &Value,
        probe: &str,
    ) -> Result<String, ApiError> {
        self.enter("test_prompt")?;
        let mut rendered = content.to_string();
        if let Some(fields) = context.as_object() {
            for (key, value) in fields {
                let text = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                rendered = rendered.replace(&format!("{{{}}}", key), &text);
            }
        }
        Ok(format!("[{}] {}", rendered, probe))
    }

    async fn current_document(&self) -> Result<String, ApiError> {
        self.enter("current_document")?;
        self.documents
            .lock()
            .unwrap()
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| ApiError::Application("无可用prompt文件".to_string()))
    }

    async fn set_current_document(&self, name: &str) -> Result<(), ApiError> {
        self.enter("set_current_document")?;
        self.document(name)
            .map(|_| ())
            .ok_or_else(|| ApiError::Application("Prompt文件不存在".to_string()))
    }
}

#[async_trait]
impl SessionBackend for FakeBackend {
    async fn create_session(&self, request: &CreateSessionRequest) -> Result<CreatedSession, ApiError> {
        self.enter("create_session")?;
        if request.session_id.is_empty() {
            return Err(ApiError::Application("session_id 不能为空".to_string()));
        }
        if self.sessions.lock().unwrap().contains_key(&request.session_id) {
            return Err(ApiError::Application(format!(
                "会话 {} 已存在",
                request.session_id
            )));
        }

        let (patient_name, data) = if let Some(file) = &request.preset_file {
            let presets = self.presets.lock().unwrap();
            let preset = presets
                .iter()
                .find(|p| &p.filename == file)
                .ok_or_else(|| ApiError::Application(format!("预设文件 {} 不存在", file)))?;
            (
                preset.name.clone().unwrap_or_else(|| "未知".to_string()),
                preset.data.clone().unwrap_or_else(|| json!({})),
            )
        } else if let Some(custom) = &request.custom_data {
            let name = custom
                .pointer("/basics/name")
                .and_then(Value::as_str)
                .unwrap_or("未知")
                .to_string();
            (name, custom.clone())
        } else {
            return Err(ApiError::Application(
                "必须提供 preset_file 或 custom_data".to_string(),
            ));
        };

        let disease = data
            .get("disease")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let summary = SessionSummary {
            session_id: request.session_id.clone(),
            patient_name: patient_name.clone(),
            disease: disease.clone(),
            message_count: 0,
            created_at: "2024-01-01T00:00:00".to_string(),
            last_activity: "2024-01-01T00:00:00".to_string(),
            status: "active".to_string(),
        };
        self.sessions.lock().unwrap().insert(
            request.session_id.clone(),
            FakeSession {
                summary,
                data,
                history: Vec::new(),
            },
        );

        Ok(CreatedSession {
            session_id: request.session_id.clone(),
            patient_name,
            disease,
            chief_complaint: Value::Null,
            created_at: "2024-01-01T00:00:00".to_string(),
        })
    }

    async fn list_sessions(&self) -> Result<SessionList, ApiError> {
        self.enter("list_sessions")?;
        let sessions: Vec<SessionSummary> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .map(|s| s.summary.clone())
            .collect();
        Ok(SessionList {
            total_sessions: sessions.len() as u32,
            max_sessions: Some(100),
            sessions,
        })
    }

    async fn session_info(&self, id: &str) -> Result<Value, ApiError> {
        self.enter("session_info")?;
        self.with_session(id, |s| {
            let mut info = s.data.clone();
            if let Some(map) = info.as_object_mut() {
                map.insert("session_id".to_string(), json!(id));
                map.insert("total_messages".to_string(), json!(s.history.len()));
            }
            info
        })
    }

    async fn session_history(&self, id: &str) -> Result<ChatHistory, ApiError> {
        self.enter("session_history")?;
        self.with_session(id, |s| ChatHistory {
            session_id: id.to_string(),
            total_messages: s.history.len() as u32,
            history: s.history.clone(),
        })
    }

    async fn delete_session(&self, id: &str) -> Result<Value, ApiError> {
        self.enter("delete_session")?;
        self.sessions
            .lock()
            .unwrap()
            .remove(id)
            .map(|s| json!({ "session_id": id, "patient_name": s.summary.patient_name }))
            .ok_or_else(|| ApiError::Application(format!("会话 {} 不存在", id)))
    }

    async fn chat(&self, id: &str, message: &str) -> Result<ChatReply, ApiError> {
        self.enter("chat")?;
        self.with_session(id, |s| {
            let reply = format!("患者回答: {}", message);
            s.history.push(HistoryEntry {
                user_message: message.to_string(),
                sp_response: reply.clone(),
                timestamp: format!("第{}轮对话", s.history.len() + 1),
            });
            s.summary.message_count += 1;
            ChatReply {
                session_id: id.to_string(),
                user_message: message.to_string(),
                sp_response: reply,
                timestamp: "2024-01-01T00:00:00".to_string(),
                message_count: s.summary.message_count,
            }
        })
    }

    async fn validate_data(&self, data: &Value) -> Result<Value, ApiError> {
        self.enter("validate_data")?;
        let missing: Vec<&str> = ["basics", "disease", "symptoms"]
            .into_iter()
            .filter(|f| data.get(f).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ApiError::Application(format!(
                "缺少必需字段: {}",
                missing.join(", ")
            )));
        }
        Ok(json!({ "valid": true }))
    }

    async fn exam_report(&self, id: &str) -> Result<Value, ApiError> {
        self.enter("exam_report")?;
        self.with_session(id, |_| json!({ "session_id": id, "report": "exam" }))
    }

    async fn score_report(&self, id: &str) -> Result<Value, ApiError> {
        self.enter("score_report")?;
        self.with_session(id, |s| json!({ "session_id": id, "conversations": s.history.len() }))
    }

    async fn score_summary(&self, id: &str) -> Result<Value, ApiError> {
        self.enter("score_summary")?;
        self.with_session(id, |_| json!({ "session_id": id, "percentage": 80 }))
    }

    async fn score_suggestions(&self, id: &str) -> Result<Value, ApiError> {
        self.enter("score_suggestions")?;
        self.with_session(id, |_| json!(["询问既往史"]))
    }

    async fn export_session(&self, id: &str) -> Result<Value, ApiError> {
        self.enter("export_session")?;
        self.with_session(id, |s| json!({ "session_id": id, "history": s.history.len() }))
    }

    async fn scoring_config(&self, id: &str) -> Result<Value, ApiError> {
        self.enter("scoring_config")?;
        self.with_session(id, |_| json!({ "threshold": 0.5 }))
    }

    async fn update_scoring_config(&self, id: &str, threshold: f64) -> Result<Value, ApiError> {
        self.enter("update_scoring_config")?;
        self.with_session(id, |_| json!({ "threshold": threshold }))
    }

    async fn scoring_stats(&self) -> Result<Value, ApiError> {
        self.enter("scoring_stats")?;
        Ok(json!({ "total_sessions": self.sessions.lock().unwrap().len() }))
    }
}
