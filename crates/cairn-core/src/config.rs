//! Configuration system for cairn.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CAIRN_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/cairn/config.toml
//!   3. ~/.config/cairn/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    pub protocol: ProtocolConfig,
    pub storage: StorageConfig,
    /// Pre-provisioned address book entries.
    pub contacts: Vec<ContactConfig>,
}

/// Which forwarding strategy the engine runs. Fixed at engine construction;
/// changing it requires a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Direct,
    #[default]
    Epidemic,
    SprayAndWait,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub strategy: StrategyKind,
    /// Initial copy budget for spray-and-wait. Ignored by other strategies.
    pub copies: u8,
    /// Weakest signal to accept, dBm. −128 accepts everything.
    pub rssi_threshold: i8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding addresses and notifications.
    pub db_path: PathBuf,
}

/// A known peer: the 32-byte address value as hex, plus a display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    pub address: String,
    pub name: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            copies: 8,
            rssi_threshold: -128,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("notifications.db"),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("cairn")
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("cairn")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl CairnConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            CairnConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CAIRN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&CairnConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CAIRN_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CAIRN_PROTOCOL__STRATEGY") {
            match v.as_str() {
                "direct" => self.protocol.strategy = StrategyKind::Direct,
                "epidemic" => self.protocol.strategy = StrategyKind::Epidemic,
                "spray-and-wait" => self.protocol.strategy = StrategyKind::SprayAndWait,
                other => tracing::warn!(value = other, "unknown CAIRN_PROTOCOL__STRATEGY"),
            }
        }
        if let Ok(v) = std::env::var("CAIRN_PROTOCOL__COPIES") {
            if let Ok(n) = v.parse() {
                self.protocol.copies = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_PROTOCOL__RSSI_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.protocol.rssi_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("CAIRN_STORAGE__DB_PATH") {
            self.storage.db_path = PathBuf::from(v);
        }
    }
}
