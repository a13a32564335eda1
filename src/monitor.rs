use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{SessionBackend, SessionList};

pub const EDITOR_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const SESSION_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// What each poll asks the server for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    /// `/health` only (prompt editor)
    Health,
    /// `/health`, then `/sp/sessions` while connected (session surface)
    HealthAndSessions,
}

/// Result of one poll
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub active_sessions: u32,
    pub sessions: Option<SessionList>,
    pub error: Option<String>,
    pub checked_at: i64,
}

pub async fn poll_once<B: SessionBackend + ?Sized>(backend: &B, target: PollTarget) -> ConnectionStatus {
    let checked_at = chrono::Utc::now().timestamp_millis();

    let health = match backend.health().await {
        Ok(health) => health,
        Err(e) => {
            return ConnectionStatus {
                connected: false,
                error: Some(e.to_string()),
                checked_at,
                ..Default::default()
            };
        }
    };

    let mut status = ConnectionStatus {
        connected: true,
        active_sessions: health.active_sessions,
        checked_at,
        ..Default::default()
    };

    if target == PollTarget::HealthAndSessions {
        match backend.list_sessions().await {
            Ok(list) => status.sessions = Some(list),
            Err(e) => {
                tracing::debug!(error = %e, "session list poll failed");
                status.error = Some(e.to_string());
            }
        }
    }

    status
}

/// Background health poller publishing through a watch channel
pub struct ConnectionMonitor<B: SessionBackend + ?Sized + 'static> {
    backend: Arc<B>,
    target: PollTarget,
    interval: Duration,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
    status: Arc<watch::Sender<ConnectionStatus>>,
}

impl<B: SessionBackend + ?Sized + 'static> ConnectionMonitor<B> {
    pub fn new(backend: Arc<B>, target: PollTarget, interval: Duration) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            backend,
            target,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
            status: Arc::new(status),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn latest(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Start the polling loop; the first poll runs immediately
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let backend = self.backend.clone();
        let running = self.running.clone();
        let status = self.status.clone();
        let target = self.target;
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut was_connected: Option<bool> = None;

            while running.load(Ordering::SeqCst) {
                let next = poll_once(&*backend, target).await;

                // stopped while the request was in flight
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                if was_connected != Some(next.connected) {
                    if next.connected {
                        tracing::info!(active_sessions = next.active_sessions, "service reachable");
                    } else {
                        tracing::warn!(error = ?next.error, "service unreachable");
                    }
                    was_connected = Some(next.connected);
                }

                status.send_replace(next);
                tokio::time::sleep(interval).await;
            }
        });

        if let Ok(mut task) = self.task.lock() {
            if let Some(previous) = task.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Stop polling; the loop is aborted even while it sleeps
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl<B: SessionBackend + ?Sized + 'static> Drop for ConnectionMonitor<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
