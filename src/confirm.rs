use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Questions the controllers ask before acting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPrompt {
    /// A local draft differs from the freshly loaded document
    LoadDraft { document: String },
    OverwriteDocument { document: String },
    RestoreBackup { backup: String, target: String },
    DeleteDocument { document: String },
    DeleteSession { session_id: String, patient_name: String },
}

impl ConfirmPrompt {
    pub fn message(&self) -> String {
        match self {
            ConfirmPrompt::LoadDraft { document } => {
                format!("An unsaved draft exists for {}. Load it?", document)
            }
            ConfirmPrompt::OverwriteDocument { document } => {
                format!("Overwrite {}? This cannot be undone.", document)
            }
            ConfirmPrompt::RestoreBackup { backup, target } => {
                format!("Replace {} with backup {}? This cannot be undone.", target, backup)
            }
            ConfirmPrompt::DeleteDocument { document } => {
                format!("Delete {}? This cannot be undone.", document)
            }
            ConfirmPrompt::DeleteSession { session_id, patient_name } => {
                format!("Delete session {} ({})?", session_id, patient_name)
            }
        }
    }
}

/// Injected yes/no decision, so destructive steps stay testable
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool;
}

/// Answers every prompt the same way
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, _prompt: &ConfirmPrompt) -> bool {
        self.0
    }
}

/// Replays queued answers in order and records what was asked.
/// Once the queue is empty it answers `false`.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<ConfirmPrompt>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<ConfirmPrompt> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(prompt.clone());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .unwrap_or(false)
    }
}
