use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wrapper every API response uses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Server-side case file usable as session source or test context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub filename: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub disease: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<Value>,
    #[serde(default)]
    pub description: String,
    /// Full case data; only some deployments include it
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub active_sessions: u32,
    #[serde(default)]
    pub expired_sessions_cleaned: Option<u32>,
    #[serde(default)]
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub disease: String,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_activity: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub max_sessions: Option<u32>,
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub session_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub disease: String,
    #[serde(default)]
    pub chief_complaint: Value,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    #[serde(default)]
    pub user_message: String,
    pub sp_response: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub message_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_message: String,
    pub sp_response: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    pub session_id: String,
    #[serde(default)]
    pub total_messages: u32,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Body for `/sp/session/create`: exactly one of preset or custom data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DocumentBody<'a> {
    pub filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RestoreBody<'a> {
    pub backup_filename: &'a str,
    pub target_filename: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TestBody<'a> {
    pub prompt_content: &'a str,
    pub context: &'a Value,
    pub doctor_message: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatBody<'a> {
    pub message: &'a str,
}
