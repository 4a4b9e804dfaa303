//! # Sync Configuration
//!
//! Configuration for the remote replica and device identity.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MIZAN_REMOTE_URL=wss://replica.example/sync                        │
//! │     MIZAN_REMOTE_ENABLED=true                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/mizan/sync.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.mizan.ledger/sync.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     remote disabled, auto-generated device id                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Front Counter"
//!
//! [remote]
//! enabled = true
//! url = "wss://replica.example/sync"
//! document_key = "shop-main"
//! ```
//!
//! The remote section is OPTIONAL by design: with `enabled = false` the
//! system runs local-only and every remote interaction is skipped. This
//! is the normal offline deployment, not a degraded mode.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Identity of this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "Front Counter").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Mizan Terminal".to_string()
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Remote Replica Configuration
// =============================================================================

/// Remote replica settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Whether the remote replica is used at all.
    /// Default: false (local-only deployment)
    #[serde(default)]
    pub enabled: bool,

    /// WebSocket URL of the replicated document store.
    /// Required when enabled.
    #[serde(default)]
    pub url: Option<String>,

    /// Key of the aggregate document mirrored 1:1 with the local cache.
    #[serde(default = "default_document_key")]
    pub document_key: String,

    /// Connection timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Timeout for a single get request (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Initial backoff duration (milliseconds) for reconnection.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds) for reconnection.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_document_key() -> String {
    "mizan-state".to_string()
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_request_timeout() -> u64 {
    10
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    60
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            enabled: false,
            url: None,
            document_key: default_document_key(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device identity.
    #[serde(default)]
    pub device: DeviceSettings,

    /// Remote replica settings.
    #[serde(default)]
    pub remote: RemoteSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.is_empty() {
            return Err(SyncError::InvalidConfig("device id is empty".into()));
        }

        if self.remote.enabled {
            let url = self.remote.url.as_deref().ok_or_else(|| {
                SyncError::InvalidConfig("remote.url is required when remote.enabled".into())
            })?;
            let parsed = url::Url::parse(url)?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(SyncError::InvalidUrl(format!(
                    "Remote URL must start with ws:// or wss://, got: {url}"
                )));
            }
            if self.remote.document_key.is_empty() {
                return Err(SyncError::InvalidConfig(
                    "remote.document_key is empty".into(),
                ));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("MIZAN_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device id from environment");
            self.device.id = id;
        }

        if let Ok(name) = std::env::var("MIZAN_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Ok(enabled) = std::env::var("MIZAN_REMOTE_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.remote.enabled = true,
                "0" | "false" | "no" => self.remote.enabled = false,
                other => warn!(value = %other, "Unknown MIZAN_REMOTE_ENABLED value"),
            }
        }

        if let Ok(url) = std::env::var("MIZAN_REMOTE_URL") {
            debug!(url = %url, "Overriding remote URL from environment");
            self.remote.url = Some(url);
        }

        if let Ok(key) = std::env::var("MIZAN_DOCUMENT_KEY") {
            self.remote.document_key = key;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mizan", "ledger")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device id.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Returns true if the remote replica should be used.
    pub fn is_remote_enabled(&self) -> bool {
        self.remote.enabled
    }

    /// Returns the mirrored document key.
    pub fn document_key(&self) -> &str {
        &self.remote.document_key
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_local_only() {
        let config = SyncConfig::new();
        assert!(!config.is_remote_enabled());
        assert!(!config.device_id().is_empty());
        assert_eq!(config.document_key(), "mizan-state");
        config.validate().unwrap();
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            [device]
            id = "dev-1"
            name = "Front Counter"

            [remote]
            enabled = true
            url = "wss://replica.example/sync"
            document_key = "shop-main"
        "#;
        let config: SyncConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.device.name, "Front Counter");
        assert!(config.remote.enabled);
        assert_eq!(config.document_key(), "shop-main");
        config.validate().unwrap();

        let serialized = toml::to_string_pretty(&config).unwrap();
        let reparsed: SyncConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(reparsed.remote.url, config.remote.url);
    }

    #[test]
    fn test_enabled_remote_requires_url() {
        let config: SyncConfig = toml::from_str(
            r#"
            [device]
            id = "dev-1"

            [remote]
            enabled = true
        "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(SyncError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_websocket_scheme_is_rejected() {
        let config: SyncConfig = toml::from_str(
            r#"
            [device]
            id = "dev-1"

            [remote]
            enabled = true
            url = "https://replica.example/sync"
        "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [device]
            id = "dev-1"
        "#,
        )
        .unwrap();
        assert!(!config.remote.enabled);
        assert_eq!(config.remote.connect_timeout_secs, 10);
        assert_eq!(config.device.name, "Mizan Terminal");
    }
}
