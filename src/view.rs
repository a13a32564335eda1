//! Terminal rendering for the CLI. Controllers never print; everything the
//! user sees goes through here.

use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::api::{ChatHistory, Preset, SessionSummary};
use crate::confirm::{Confirm, ConfirmPrompt};
use crate::drafts::Draft;
use crate::editor::{EditorEvent, EditorState};
use crate::monitor::ConnectionStatus;
use crate::ui::{Notification, NotificationCenter};

/// Asks on stderr, reads the answer from stdin
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        let question = prompt.message();
        let answer = tokio::task::spawn_blocking(move || {
            eprint!("{} [y/N] ", question);
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_yes(&line),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn render_notification(notification: &Notification) -> String {
    match &notification.title {
        Some(title) => format!(
            "[{}] {}: {}",
            notification.level.label(),
            title,
            notification.message
        ),
        None => format!("[{}] {}", notification.level.label(), notification.message),
    }
}

/// Print notifications to stderr as they are raised
pub fn spawn_notification_printer(center: &Arc<NotificationCenter>) -> JoinHandle<()> {
    let mut rx = center.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => eprintln!("{}", render_notification(&notification)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "notification printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Editor events go to the debug log; the command result is printed separately
pub fn spawn_event_logger(mut events: UnboundedReceiver<EditorEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!("{}", render_event(&event));
        }
    })
}

pub fn render_event(event: &EditorEvent) -> String {
    match event {
        EditorEvent::StateChanged(state) => format!("state: {}", render_state(state)),
        EditorEvent::BufferReplaced { content } => {
            format!("buffer replaced ({} chars)", content.chars().count())
        }
        EditorEvent::DocumentsListed(names) => format!("{} prompt files", names.len()),
        EditorEvent::BackupsListed(names) => format!("{} backups", names.len()),
        EditorEvent::VariablesListed(vars) => format!("variables: {}", vars.join(", ")),
        EditorEvent::TestResult(output) => format!("test result ({} chars)", output.chars().count()),
        EditorEvent::Failed { action, kind, message } => {
            format!("{:?} failed ({:?}): {}", action, kind, message)
        }
    }
}

pub fn render_state(state: &EditorState) -> String {
    match state {
        EditorState::NoDocumentSelected => "no document selected".to_string(),
        EditorState::DocumentLoaded { name } => format!("editing {}", name),
        EditorState::Busy { action, .. } => format!("busy ({:?})", action),
    }
}

pub fn render_status(status: &ConnectionStatus) -> String {
    let checked = chrono::DateTime::from_timestamp_millis(status.checked_at)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    if status.connected {
        let mut line = format!("{} connected, {} active sessions", checked, status.active_sessions);
        if let Some(list) = &status.sessions {
            line.push_str(&format!(" ({} listed)", list.sessions.len()));
        }
        line
    } else {
        format!(
            "{} disconnected: {}",
            checked,
            status.error.as_deref().unwrap_or("unknown error")
        )
    }
}

pub fn render_sessions(sessions: &[SessionSummary]) -> String {
    if sessions.is_empty() {
        return "No sessions".to_string();
    }
    sessions
        .iter()
        .map(|s| {
            format!(
                "{}\t{}\t{}\t{} messages\t{}",
                s.session_id, s.patient_name, s.disease, s.message_count, s.last_activity
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_presets(presets: &[Preset]) -> String {
    presets
        .iter()
        .map(|p| format!("{}\t{}", p.filename, p.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_history(history: &ChatHistory) -> String {
    if history.history.is_empty() {
        return format!("Session {} has no messages", history.session_id);
    }
    history
        .history
        .iter()
        .map(|h| format!("医生: {}\n患者: {}", h.user_message, h.sp_response))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_drafts(drafts: &[Draft]) -> String {
    if drafts.is_empty() {
        return "No drafts".to_string();
    }
    drafts
        .iter()
        .map(|d| {
            let saved = chrono::DateTime::from_timestamp_millis(d.updated_at)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            format!("{}\t{}\t{} chars", d.document, saved, d.content.chars().count())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!(error = %e, "could not render response"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HistoryEntry, SessionList};
    use crate::editor::EditorAction;
    use crate::error::ErrorKind;
    use crate::ui::NotificationLevel;

    #[test]
    fn test_yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[tokio::test]
    async fn test_render_notification() {
        let center = NotificationCenter::default();
        center.show(
            NotificationLevel::Warning,
            "Select a prompt file first",
            Some("Save".to_string()),
            None,
        );

        let active = center.active();
        assert_eq!(render_notification(&active[0]), "[warning] Save: Select a prompt file first");
    }

    #[test]
    fn test_render_failed_event() {
        let event = EditorEvent::Failed {
            action: EditorAction::Save,
            kind: ErrorKind::Network,
            message: "Network error: connection refused".into(),
        };
        assert_eq!(
            render_event(&event),
            "Save failed (Network): Network error: connection refused"
        );
    }

    #[test]
    fn test_render_busy_state() {
        let state = EditorState::Busy {
            action: EditorAction::Restore,
            resume: Box::new(EditorState::DocumentLoaded { name: "a.txt".into() }),
        };
        assert_eq!(render_state(&state), "busy (Restore)");
    }

    #[test]
    fn test_render_status() {
        let status = ConnectionStatus {
            connected: true,
            active_sessions: 2,
            sessions: Some(SessionList::default()),
            checked_at: 0,
            ..Default::default()
        };
        assert_eq!(render_status(&status), "00:00:00 connected, 2 active sessions (0 listed)");

        let down = ConnectionStatus {
            error: Some("timeout".into()),
            ..Default::default()
        };
        assert_eq!(render_status(&down), "00:00:00 disconnected: timeout");
    }

    #[test]
    fn test_render_history() {
        let history = ChatHistory {
            session_id: "s1".into(),
            total_messages: 1,
            history: vec![HistoryEntry {
                user_message: "哪里不舒服？".into(),
                sp_response: "头疼。".into(),
                timestamp: String::new(),
            }],
        };
        assert_eq!(render_history(&history), "医生: 哪里不舒服？\n患者: 头疼。");
    }
}
