//! Runtime configuration, read from a JSON file.
//!
//! Every field has a default, so `{}` is a complete config and a missing
//! file just means "run with defaults".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{Error, UserId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub attachments: AttachmentsConfig,
    pub library: LibraryConfig,
    pub tools: ToolsConfig,
    pub notifications: NotificationsConfig,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Validation(format!("invalid config: {e}")))
    }

    /// Read `path` if given. Unreadable or malformed files are logged and
    /// replaced by the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        let loaded = std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| Self::from_json(&text));
        match loaded {
            Ok(config) => config,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
                Self::default()
            }
        }
    }

    /// Settings that parse but are probably mistakes.
    pub fn validate(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut warn_if = |cond: bool, msg: &str| {
            if cond {
                out.push(msg.to_string());
            }
        };

        warn_if(
            self.server.port == 0,
            "server.port is 0; a random port will be assigned",
        );
        warn_if(
            self.attachments.extraction_timeout_secs == 0,
            "attachments.extraction_timeout_secs is 0; extractions run without a time limit",
        );
        warn_if(
            self.library.catalog_path.is_none(),
            "library.catalog_path is not set; no media sources can be resolved",
        );
        warn_if(
            self.notifications.max_per_user == 0,
            "notifications.max_per_user is 0; notifications are dropped",
        );
        warn_if(
            self.notifications.max_users == 0,
            "notifications.max_users is 0; only the latest recipient keeps an inbox",
        );

        out.extend(
            self.notifications
                .webhooks
                .iter()
                .enumerate()
                .filter(|(_, hook)| hook.url.is_empty())
                .map(|(i, _)| format!("notifications.webhooks[{i}].url is empty")),
        );
        out
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8096,
        }
    }
}

/// Which container prober backs attachment extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProberKind {
    /// Pure-Rust Matroska first, ffmpeg as fallback.
    #[default]
    Auto,
    /// Only ffmpeg/ffprobe.
    Ffmpeg,
    /// Only the pure-Rust Matroska reader.
    Matroska,
}

/// Extracted-attachment cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentsConfig {
    pub cache_dir: PathBuf,
    pub prober: ProberKind,
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,
}

fn default_extraction_timeout() -> u64 {
    300
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/attachments"),
            prober: ProberKind::default(),
            extraction_timeout_secs: default_extraction_timeout(),
        }
    }
}

/// Media library catalogue settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// JSON file listing items and their media sources.
    pub catalog_path: Option<PathBuf>,
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Severity of a notification, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum NotificationLevel {
    #[default]
    Normal,
    Warning,
    Error,
}

/// Outbound webhook that receives every notification at or above `min_level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub min_level: NotificationLevel,
}

/// Notification delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Users that receive notifications posted to the admin endpoint.
    pub admin_users: Vec<UserId>,
    #[serde(default = "default_max_per_user")]
    pub max_per_user: usize,
    /// Inboxes kept in memory. Past this, the least recently notified
    /// user's inbox is dropped.
    #[serde(default = "default_max_users")]
    pub max_users: usize,
    pub webhooks: Vec<WebhookConfig>,
}

fn default_max_per_user() -> usize {
    200
}

fn default_max_users() -> usize {
    10_000
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            admin_users: Vec::new(),
            max_per_user: default_max_per_user(),
            max_users: default_max_users(),
            webhooks: Vec::new(),
        }
    }
}
