//! # Player Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MARQUEE_DEVICE_ID=abc-123                                          │
//! │     MARQUEE_CLOUD_URL=https://api.example.com:50051                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/marquee-player/player.toml (Linux)                       │
//! │     ~/Library/Application Support/io.marquee.player/player.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     interval constants, generated device_id placeholder                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # player.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"   # assigned at pairing
//! name = "Lobby Screen 2"
//!
//! [api]
//! cloud_url = "https://api.marquee.example:50051"
//! device_token = "mqp_..."                       # issued at pairing
//!
//! [sync]
//! heartbeat_interval_secs = 30
//! command_poll_interval_secs = 10
//!
//! [push]
//! enabled = true
//! realtime_url = "wss://realtime.marquee.example/channels"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PlayerError, PlayerResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this display device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Unique device identifier (UUID v4), assigned at pairing.
    /// Immutable for the process lifetime.
    pub id: String,

    /// Human-readable device name (e.g., "Lobby Screen 2").
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Player software version reported in extended heartbeats.
    #[serde(default = "default_player_version")]
    pub player_version: String,
}

fn default_device_name() -> String {
    "Marquee Display".to_string()
}

fn default_player_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
            player_version: default_player_version(),
        }
    }
}

// =============================================================================
// Cloud API Settings
// =============================================================================

/// Settings for the gRPC cloud API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Cloud API endpoint URL (e.g., "https://api.marquee.example:50051").
    #[serde(default = "default_cloud_url")]
    pub cloud_url: String,

    /// Opaque bearer token issued at pairing.
    #[serde(default)]
    pub device_token: String,

    /// Enable TLS verification (should be true in production).
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Connection timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_cloud_url() -> String {
    "http://localhost:50051".to_string()
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            cloud_url: default_cloud_url(),
            device_token: String::new(),
            verify_tls: true,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Timer and retry settings for the sync loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between heartbeats (seconds). First tick fires immediately.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Interval between command polls (seconds). First tick fires immediately.
    #[serde(default = "default_poll_interval")]
    pub command_poll_interval_secs: u64,

    /// Interval between poll-based content refreshes (seconds). Push makes
    /// these cheap no-ops via fingerprinting; the timer is the fallback that
    /// keeps content current when every push channel is down.
    #[serde(default = "default_content_refresh_interval")]
    pub content_refresh_interval_secs: u64,

    /// Live-fetch attempts per content refresh before falling back to cache.
    /// The original player mixed 3 and higher counts across call sites; this
    /// engine uses one bounded constant everywhere.
    #[serde(default = "default_fetch_attempts")]
    pub content_fetch_max_attempts: u32,

    /// Base backoff between live-fetch attempts (milliseconds).
    #[serde(default = "default_fetch_backoff_base")]
    pub fetch_backoff_base_ms: u64,

    /// Backoff ceiling between live-fetch attempts (milliseconds).
    #[serde(default = "default_fetch_backoff_max")]
    pub fetch_backoff_max_ms: u64,

    /// Grace delay between a reboot/reset success report and the restart
    /// request, letting the report flush (milliseconds).
    #[serde(default = "default_reboot_grace")]
    pub reboot_grace_ms: u64,

    /// Path to the offline cache database. None = platform data dir.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

fn default_heartbeat_interval() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    10
}
fn default_content_refresh_interval() -> u64 {
    300
}
fn default_fetch_attempts() -> u32 {
    3
}
fn default_fetch_backoff_base() -> u64 {
    250
}
fn default_fetch_backoff_max() -> u64 {
    5_000
}
fn default_reboot_grace() -> u64 {
    1_500
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            heartbeat_interval_secs: default_heartbeat_interval(),
            command_poll_interval_secs: default_poll_interval(),
            content_refresh_interval_secs: default_content_refresh_interval(),
            content_fetch_max_attempts: default_fetch_attempts(),
            fetch_backoff_base_ms: default_fetch_backoff_base(),
            fetch_backoff_max_ms: default_fetch_backoff_max(),
            reboot_grace_ms: default_reboot_grace(),
            cache_path: None,
        }
    }
}

// =============================================================================
// Push Settings
// =============================================================================

/// Settings for the push channel facility.
///
/// Push is an optimization, not the only path: when a channel fails
/// terminally, the poll-based loops keep the device alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSettings {
    /// Whether to open push channels at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// WebSocket URL of the realtime facility
    /// (e.g., "wss://realtime.marquee.example/channels").
    #[serde(default)]
    pub realtime_url: Option<String>,

    /// Maximum reconnection attempts per channel before that channel is
    /// marked terminally failed.
    #[serde(default = "default_max_channel_retries")]
    pub max_channel_retries: u32,

    /// Base backoff between channel reconnects (milliseconds).
    #[serde(default = "default_channel_backoff_base")]
    pub channel_backoff_base_ms: u64,

    /// Backoff ceiling between channel reconnects (milliseconds).
    #[serde(default = "default_channel_backoff_max")]
    pub channel_backoff_max_ms: u64,

    /// Channel connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_channel_retries() -> u32 {
    10
}
fn default_channel_backoff_base() -> u64 {
    1_000
}
fn default_channel_backoff_max() -> u64 {
    60_000
}

impl Default for PushSettings {
    fn default() -> Self {
        PushSettings {
            enabled: true,
            realtime_url: None,
            max_channel_retries: default_max_channel_retries(),
            channel_backoff_base_ms: default_channel_backoff_base(),
            channel_backoff_max_ms: default_channel_backoff_max(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Main Player Configuration
// =============================================================================

/// Complete player configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Device-specific configuration.
    #[serde(default)]
    pub device: DeviceSettings,

    /// Cloud API settings.
    #[serde(default)]
    pub api: ApiSettings,

    /// Timer and retry settings.
    #[serde(default)]
    pub sync: SyncSettings,

    /// Push channel settings.
    #[serde(default)]
    pub push: PushSettings,
}

impl PlayerConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (player.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> PlayerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading player config from file");
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
            warn!("Failed to load player config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> PlayerResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| PlayerError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Player config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> PlayerResult<()> {
        if self.device.id.is_empty() {
            return Err(PlayerError::MissingDeviceId);
        }

        let cloud = url::Url::parse(&self.api.cloud_url)?;
        if cloud.scheme() != "http" && cloud.scheme() != "https" {
            return Err(PlayerError::InvalidUrl(format!(
                "Cloud URL must be http:// or https://, got: {}",
                self.api.cloud_url
            )));
        }

        if self.push.enabled {
            if let Some(ref url) = self.push.realtime_url {
                let parsed = url::Url::parse(url)?;
                if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                    return Err(PlayerError::InvalidUrl(format!(
                        "Realtime URL must be ws:// or wss://, got: {}",
                        url
                    )));
                }
            }
        }

        if self.sync.content_fetch_max_attempts == 0 {
            return Err(PlayerError::InvalidConfig(
                "content_fetch_max_attempts must be greater than 0".into(),
            ));
        }

        if self.sync.heartbeat_interval_secs == 0 || self.sync.command_poll_interval_secs == 0 {
            return Err(PlayerError::InvalidConfig(
                "heartbeat and poll intervals must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("MARQUEE_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Ok(name) = std::env::var("MARQUEE_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Ok(url) = std::env::var("MARQUEE_CLOUD_URL") {
            debug!(url = %url, "Overriding cloud URL from environment");
            self.api.cloud_url = url;
        }

        if let Ok(token) = std::env::var("MARQUEE_DEVICE_TOKEN") {
            self.api.device_token = token;
        }

        if let Ok(url) = std::env::var("MARQUEE_REALTIME_URL") {
            debug!(url = %url, "Overriding realtime URL from environment");
            self.push.realtime_url = Some(url);
        }

        if let Ok(enabled) = std::env::var("MARQUEE_PUSH_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.push.enabled = true,
                "0" | "false" | "no" => self.push.enabled = false,
                other => warn!(value = %other, "Unknown MARQUEE_PUSH_ENABLED value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "marquee", "player").map(|dirs| {
            let config_dir = dirs.config_dir();
            config_dir.join("player.toml")
        })
    }

    /// Returns the default offline cache path.
    pub fn default_cache_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "marquee", "player")
            .map(|dirs| dirs.data_dir().join("cache.db"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Returns the heartbeat interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.sync.heartbeat_interval_secs)
    }

    /// Returns the command poll interval.
    pub fn command_poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.command_poll_interval_secs)
    }

    /// Returns the poll-based content refresh interval.
    pub fn content_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.sync.content_refresh_interval_secs)
    }

    /// Returns the reboot grace delay.
    pub fn reboot_grace(&self) -> Duration {
        Duration::from_millis(self.sync.reboot_grace_ms)
    }

    /// Returns true if push channels should be attached.
    pub fn push_enabled(&self) -> bool {
        self.push.enabled && self.push.realtime_url.is_some()
    }
}
