use serde::Deserialize;
use std::{env, fmt::Display, fs, io, path::PathBuf, time::Duration};
use thiserror::Error;

const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub tcp_socket_binding: String,
    pub tcp_socket_port: u16,
    pub database_path: PathBuf,
    pub static_dir: PathBuf,
    /// Origin used to build share links, without a trailing slash.
    pub public_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_in_minutes: u32,
    #[serde(default = "default_home_revalidate_seconds")]
    pub home_revalidate_seconds: u64,
    #[serde(default = "default_notice_auto_hide_ms")]
    pub notice_auto_hide_ms: u64,
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    /// strftime pattern for the task detail date.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    pub default_user: DefaultUser,
}

/// Account seeded into an empty save file.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultUser {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse settings file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

fn default_home_revalidate_seconds() -> u64 {
    60
}

fn default_notice_auto_hide_ms() -> u64 {
    2000
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_date_format() -> String {
    "%-m/%-d/%Y".to_string()
}

impl Settings {
    /// Load `settings.json` from the working directory, falling back to the
    /// directory of the running executable (where build.rs drops a copy).
    /// `PUBLIC_URL` and `JWT_SECRET` override the file.
    pub fn load() -> Result<Settings, SettingsError> {
        let path = Self::locate();
        let content = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;
        let mut settings = Self::from_json(&content)
            .map_err(|source| SettingsError::Parse { path, source })?;

        if let Ok(url) = env::var("PUBLIC_URL") {
            settings.public_url = url;
        }
        if let Ok(secret) = env::var("JWT_SECRET") {
            settings.jwt_secret = secret;
        }
        settings.normalize();
        Ok(settings)
    }

    pub fn from_json(content: &str) -> Result<Settings, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(content)?;
        settings.normalize();
        Ok(settings)
    }

    fn locate() -> PathBuf {
        let local = PathBuf::from(SETTINGS_FILENAME);
        if local.exists() {
            return local;
        }
        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(SETTINGS_FILENAME)))
            .filter(|p| p.exists())
            .unwrap_or(local)
    }

    fn normalize(&mut self) {
        while self.public_url.ends_with('/') {
            self.public_url.pop();
        }
    }

    pub fn home_revalidate(&self) -> Duration {
        Duration::from_secs(self.home_revalidate_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.tcp_socket_binding, self.tcp_socket_port)
    }
}

/// Share link for a task: `{public_url}/task/{id}`.
pub fn share_url(public_url: &str, task_id: impl Display) -> String {
    format!("{public_url}/task/{task_id}")
}

#[cfg(test)]
pub(crate) fn test_settings(dir: &std::path::Path) -> Settings {
    Settings::from_json(
        &serde_json::json!({
            "tcp_socket_binding": "127.0.0.1",
            "tcp_socket_port": 0,
            "database_path": dir.join("tasks.redb"),
            "static_dir": dir.join("static"),
            "public_url": "https://tasks.example.com",
            "jwt_secret": "test-secret",
            "jwt_expiration_in_minutes": 60,
            "default_user": {
                "email": "admin@localhost",
                "name": "Admin",
                "password": "admin"
            }
        })
        .to_string(),
    )
    .unwrap()
}
