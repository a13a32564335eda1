use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(5000);
const MAX_NOTIFICATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "ok",
            NotificationLevel::Error => "error",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: String,
    pub level: NotificationLevel,
    pub title: Option<String>,
    pub message: String,
    pub created_at: i64,
    /// Zero means the notification stays until dismissed
    pub duration_ms: u64,
    #[serde(skip)]
    expires_at: Option<Instant>,
}

impl Notification {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Ephemeral user feedback. Entries expire on their own timer and the
/// oldest is dropped once the list is full.
pub struct NotificationCenter {
    entries: Mutex<VecDeque<Notification>>,
    default_duration: Duration,
    sender: broadcast::Sender<Notification>,
}

impl NotificationCenter {
    pub fn new(default_duration: Duration) -> Self {
        let (sender, _) = broadcast::channel(MAX_NOTIFICATIONS);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(MAX_NOTIFICATIONS)),
            default_duration,
            sender,
        }
    }

    /// Receive every notification shown from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn show(
        &self,
        level: NotificationLevel,
        message: impl Into<String>,
        title: Option<String>,
        duration: Option<Duration>,
    ) -> String {
        let duration = duration.unwrap_or(self.default_duration);
        let now = Instant::now();
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            level,
            title,
            message: message.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
            duration_ms: duration.as_millis() as u64,
            expires_at: if duration.is_zero() {
                None
            } else {
                Some(now + duration)
            },
        };
        let id = notification.id.clone();

        match level {
            NotificationLevel::Error => tracing::warn!(message = %notification.message, "notification"),
            _ => tracing::debug!(level = level.label(), message = %notification.message, "notification"),
        }

        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|n| !n.is_expired(now));
            if entries.len() >= MAX_NOTIFICATIONS {
                entries.pop_front();
            }
            entries.push_back(notification.clone());
        }

        // No subscribers is fine
        let _ = self.sender.send(notification);
        id
    }

    pub fn success(&self, message: impl Into<String>) -> String {
        self.show(NotificationLevel::Success, message, None, None)
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.show(NotificationLevel::Error, message, None, None)
    }

    pub fn warning(&self, message: impl Into<String>) -> String {
        self.show(NotificationLevel::Warning, message, None, None)
    }

    pub fn info(&self, message: impl Into<String>) -> String {
        self.show(NotificationLevel::Info, message, None, None)
    }

    /// Notifications that have not expired yet, oldest first
    pub fn active(&self) -> Vec<Notification> {
        let now = Instant::now();
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.retain(|n| !n.is_expired(now));
                entries.iter().cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn dismiss(&self, id: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|n| n.id != id);
                entries.len() != before
            }
            Err(_) => false,
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notifications_expire() {
        let center = NotificationCenter::default();
        center.success("已加载 a.txt");
        center.show(NotificationLevel::Info, "short", None, Some(Duration::from_millis(1000)));

        assert_eq!(center.active().len(), 2);

        tokio::time::advance(Duration::from_millis(1500)).await;
        let active = center.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "已加载 a.txt");

        tokio::time::advance(Duration::from_millis(4000)).await;
        assert!(center.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_is_sticky() {
        let center = NotificationCenter::default();
        let id = center.show(NotificationLevel::Error, "sticky", None, Some(Duration::ZERO));

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(center.active().len(), 1);

        assert!(center.dismiss(&id));
        assert!(center.active().is_empty());
    }

    #[test]
    fn test_oldest_dropped_when_full() {
        let center = NotificationCenter::new(Duration::ZERO);
        for i in 0..(MAX_NOTIFICATIONS + 5) {
            center.info(format!("n{}", i));
        }
        let active = center.active();
        assert_eq!(active.len(), MAX_NOTIFICATIONS);
        assert_eq!(active[0].message, "n5");
    }

    #[test]
    fn test_subscribers_receive_notifications() {
        let center = NotificationCenter::default();
        let mut rx = center.subscribe();
        center.warning("请先选择Prompt文件");

        let received = rx.try_recv().unwrap();
        assert_eq!(received.level, NotificationLevel::Warning);
        assert_eq!(received.message, "请先选择Prompt文件");
    }
}
