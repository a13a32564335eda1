use serde::Serialize;

use crate::api::{Preset, SessionSummary};

/// Where a new session's patient data comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSource {
    /// Server-side case file
    Preset(String),
    /// User-typed case JSON
    Custom(String),
}

/// Everything the session surface shows, owned by `SessionController`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppContext {
    pub current_session: Option<SessionSummary>,
    pub sessions: Vec<SessionSummary>,
    pub presets: Vec<Preset>,
    pub connected: bool,
    pub active_sessions: u32,
}

impl AppContext {
    pub fn current_id(&self) -> Option<&str> {
        self.current_session.as_ref().map(|s| s.session_id.as_str())
    }

    pub fn find(&self, id: &str) -> Option<&SessionSummary> {
        self.sessions.iter().find(|s| s.session_id == id)
    }

    /// Replace the list and re-point the current session at its fresh record
    pub fn replace_sessions(&mut self, sessions: Vec<SessionSummary>) {
        self.current_session = self
            .current_id()
            .and_then(|id| sessions.iter().find(|s| s.session_id == id))
            .cloned();
        self.sessions = sessions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, count: u32) -> SessionSummary {
        SessionSummary {
            session_id: id.to_string(),
            message_count: count,
            ..Default::default()
        }
    }

    #[test]
    fn test_replace_keeps_current_fresh() {
        let mut ctx = AppContext {
            current_session: Some(summary("s1", 0)),
            sessions: vec![summary("s1", 0)],
            ..Default::default()
        };

        ctx.replace_sessions(vec![summary("s1", 4), summary("s2", 0)]);

        assert_eq!(ctx.current_session.as_ref().unwrap().message_count, 4);
        assert_eq!(ctx.sessions.len(), 2);
    }

    #[test]
    fn test_replace_clears_vanished_current() {
        let mut ctx = AppContext {
            current_session: Some(summary("gone", 1)),
            ..Default::default()
        };

        ctx.replace_sessions(vec![summary("s2", 0)]);

        assert!(ctx.current_session.is_none());
        assert_eq!(ctx.current_id(), None);
    }
}
