use crate::database::{Database, DbError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api";
pub const BASE_URL_ENV: &str = "SP_STUDIO_BASE_URL";

/// Client settings, persisted as key/value rows in the `settings` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub base_url: String,
    /// Idle window before an edit is written to the draft store
    pub draft_delay_ms: u64,
    pub editor_poll_secs: u64,
    pub session_poll_secs: u64,
    pub notification_ms: u64,
    /// No timeout when unset
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            draft_delay_ms: 1000,
            editor_poll_secs: 10,
            session_poll_secs: 30,
            notification_ms: 5000,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl Settings {
    pub const KEYS: [&'static str; 6] = [
        "base_url",
        "draft_delay_ms",
        "editor_poll_secs",
        "session_poll_secs",
        "notification_ms",
        "request_timeout_secs",
    ];

    pub fn draft_delay(&self) -> Duration {
        Duration::from_millis(self.draft_delay_ms)
    }

    pub fn editor_poll_interval(&self) -> Duration {
        Duration::from_secs(self.editor_poll_secs)
    }

    pub fn session_poll_interval(&self) -> Duration {
        Duration::from_secs(self.session_poll_secs)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Environment takes precedence over stored values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Result<String, SettingsError> {
        let value = match key {
            "base_url" => self.base_url.clone(),
            "draft_delay_ms" => self.draft_delay_ms.to_string(),
            "editor_poll_secs" => self.editor_poll_secs.to_string(),
            "session_poll_secs" => self.session_poll_secs.to_string(),
            "notification_ms" => self.notification_ms.to_string(),
            "request_timeout_secs" => self
                .request_timeout_secs
                .map(|s| s.to_string())
                .unwrap_or_default(),
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let number = || value.trim().parse::<u64>().map_err(|_| invalid());

        match key {
            "base_url" => {
                let url = value.trim();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(invalid());
                }
                self.base_url = url.to_string();
            }
            "draft_delay_ms" => self.draft_delay_ms = number()?,
            "editor_poll_secs" => self.editor_poll_secs = number()?.max(1),
            "session_poll_secs" => self.session_poll_secs = number()?.max(1),
            "notification_ms" => self.notification_ms = number()?,
            "request_timeout_secs" => {
                self.request_timeout_secs = if value.trim().is_empty() {
                    None
                } else {
                    Some(number()?)
                };
            }
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

impl Database {
    pub fn create_settings_table(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Load settings; keys that are missing or unparseable keep their defaults
    pub fn get_settings(&self) -> Result<Settings, DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut settings = Settings::default();
        for row in rows {
            let (key, value) = row?;
            if let Err(e) = settings.set(&key, &value) {
                tracing::warn!(%key, error = %e, "ignoring stored setting");
            }
        }

        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), DbError> {
        let conn = self.conn.lock().map_err(|_| DbError::Lock)?;

        for key in Settings::KEYS {
            let value = settings.get(key).unwrap_or_default();
            conn.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let db = Database::open_in_memory().unwrap();
        let mut settings = Settings::default();
        settings.set("base_url", "https://api.example.org/api").unwrap();
        settings.set("draft_delay_ms", "250").unwrap();
        settings.set("request_timeout_secs", "15").unwrap();

        db.save_settings(&settings).unwrap();
        let loaded = db.get_settings().unwrap();

        assert_eq!(loaded.base_url, "https://api.example.org/api");
        assert_eq!(loaded.draft_delay(), Duration::from_millis(250));
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.set("colour", "blue"),
            Err(SettingsError::UnknownKey(_))
        ));
        assert!(matches!(
            settings.set("draft_delay_ms", "soon"),
            Err(SettingsError::InvalidValue { .. })
        ));
        assert!(settings.set("base_url", "ftp://nope").is_err());
    }

    #[test]
    fn test_empty_timeout_clears_it() {
        let mut settings = Settings::default();
        settings.set("request_timeout_secs", "5").unwrap();
        settings.set("request_timeout_secs", "").unwrap();
        assert_eq!(settings.request_timeout(), None);
    }
}
