use std::{collections::HashMap, fs, path::PathBuf};

use serde::Deserialize;
use tracing::warn;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    /// Optional `{ "<id>": { "food": [...], "cuisine": [...] } }` export
    /// imported into storage at startup.
    pub directory_seed_path: Option<PathBuf>,
    pub directory_refresh_seconds: u64,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "0.0.0.0:8080".into(),
            database_url: "sqlite://./data/foodrun.db".into(),
            directory_seed_path: None,
            directory_refresh_seconds: 30,
            max_body_bytes: 64 * 1024,
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    resolve_settings(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `server.toml` table, then environment overrides.
pub fn resolve_settings(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file"),
        }
    }

    if let Some(port) = env("PORT") {
        settings.server_bind = format!("0.0.0.0:{}", port.trim());
    }
    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__DIRECTORY_SEED") {
        settings.directory_seed_path = Some(PathBuf::from(v));
    }

    if let Some(v) = env("APP__DIRECTORY_REFRESH_SECONDS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.directory_refresh_seconds = parsed;
        }
    }
    if let Some(v) = env("APP__MAX_BODY_BYTES") {
        if let Ok(parsed) = v.trim().parse::<usize>() {
            settings.max_body_bytes = parsed;
        }
    }

    settings.directory_refresh_seconds = settings.directory_refresh_seconds.max(1);
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("bind_addr").and_then(toml::Value::as_str) {
        settings.server_bind = v.to_string();
    }
    if let Some(v) = file_cfg.get("database_url").and_then(toml::Value::as_str) {
        settings.database_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("directory_seed").and_then(toml::Value::as_str) {
        settings.directory_seed_path = Some(PathBuf::from(v));
    }
    if let Some(v) = file_cfg
        .get("directory_refresh_seconds")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.directory_refresh_seconds = v;
    }
    if let Some(v) = file_cfg
        .get("max_body_bytes")
        .and_then(toml::Value::as_integer)
        .and_then(|v| usize::try_from(v).ok())
    {
        settings.max_body_bytes = v;
    }
}

/// Turns a bare file path into a `sqlite://` URL; other URLs pass through.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{raw_database_url}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
