use serde::Serialize;

use crate::error::ErrorKind;

/// User-triggered editor actions that make a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditorAction {
    Bootstrap,
    ListDocuments,
    Select,
    Create,
    Save,
    Backup,
    ListBackups,
    LoadBackup,
    Restore,
    Delete,
    Variables,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state")]
pub enum EditorState {
    NoDocumentSelected,
    DocumentLoaded { name: String },
    /// A request is in flight; `resume` is the state to return to on failure
    Busy {
        action: EditorAction,
        resume: Box<EditorState>,
    },
}

impl EditorState {
    pub fn document(&self) -> Option<&str> {
        match self {
            EditorState::NoDocumentSelected => None,
            EditorState::DocumentLoaded { name } => Some(name),
            EditorState::Busy { resume, .. } => resume.document(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, EditorState::Busy { .. })
    }
}

/// Where the dry-run context comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestContext {
    /// A preset's case data, by filename
    Preset(String),
    /// User-typed JSON
    Custom(String),
}

/// Result of a confirmation-gated action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActionOutcome {
    Completed,
    Declined,
}

/// What the view layer needs to redraw
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum EditorEvent {
    StateChanged(EditorState),
    BufferReplaced { content: String },
    DocumentsListed(Vec<String>),
    BackupsListed(Vec<String>),
    VariablesListed(Vec<String>),
    TestResult(String),
    Failed {
        action: EditorAction,
        kind: ErrorKind,
        message: String,
    },
}
