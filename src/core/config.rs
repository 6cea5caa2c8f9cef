use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::Result;

/// Service settings, persisted as settings.json in the config directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Address the HTTP/WebSocket server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// JSON-lines feed exported by the report store
    #[serde(default = "default_feed_path")]
    pub feed_path: PathBuf,
    /// Geofence radius used when a nearby query gives none
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Default log filter, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_feed_path() -> PathBuf {
    PathBuf::from("reports.jsonl")
}

fn default_radius_km() -> f64 {
    10.0
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            feed_path: default_feed_path(),
            default_radius_km: default_radius_km(),
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load settings, falling back to defaults when the file is missing or invalid.
    pub fn load(&self) -> Settings {
        if !self.config_path.exists() {
            return Settings::default();
        }
        let parsed = fs::read_to_string(&self.config_path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));
        match parsed {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable settings at {:?}: {}",
                    self.config_path,
                    e
                );
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }
}
