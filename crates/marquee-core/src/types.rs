//! # Domain Types
//!
//! Core domain types used throughout the Marquee player.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌───────────────────┐   │
//! │  │ ContentSnapshot  │   │     Command      │   │   DeviceRecord    │   │
//! │  │  ──────────────  │   │  ──────────────  │   │  ───────────────  │   │
//! │  │  device          │   │  id (UUID)       │   │  id (UUID)        │   │
//! │  │  sequence?       │   │  command_type    │   │  active_sequence  │   │
//! │  │    └─ items[]    │   │  payload?        │   │  refresh marker   │   │
//! │  └──────────────────┘   │  created_at      │   └───────────────────┘   │
//! │                         └──────────────────┘                           │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌───────────────────┐   │
//! │  │   SequenceItem   │   │   CommandType    │   │   RefreshReason   │   │
//! │  │  ──────────────  │   │  ──────────────  │   │  ───────────────  │   │
//! │  │  kind            │   │  Reboot          │   │  SceneChange      │   │
//! │  │  source          │   │  Reload          │   │  RefreshRequested │   │
//! │  │  duration_secs   │   │  ClearCache      │   └───────────────────┘   │
//! │  │  width/height    │   │  Reset           │                           │
//! │  └──────────────────┘   │  Unknown(String) │                           │
//! │                         └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity Rules
//! - Devices and commands carry UUID v4 ids minted by the cloud.
//! - Content snapshots have **no** identity of their own: two snapshots are
//!   the same content iff their fingerprints match (see [`crate::fingerprint`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Sequence Items
// =============================================================================

/// The kind of media a sequence item renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ItemKind {
    /// Still image (PNG, JPEG, WebP).
    Image,

    /// Video file, played muted and looped if shorter than its slot.
    Video,

    /// Live web page rendered in an embedded view.
    Web,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Image => write!(f, "image"),
            ItemKind::Video => write!(f, "video"),
            ItemKind::Web => write!(f, "web"),
        }
    }
}

/// One renderable item inside a content sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SequenceItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// What kind of media this item is.
    pub kind: ItemKind,

    /// Source locator: a storage URL for media, a page URL for web items.
    pub source: String,

    /// How long this item stays on screen, in seconds.
    pub duration_secs: u32,

    /// Render width in pixels (None = fit to screen).
    pub width: Option<u32>,

    /// Render height in pixels (None = fit to screen).
    pub height: Option<u32>,
}

/// An ordered list of items the player cycles through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContentSequence {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown in the dashboard.
    pub name: String,

    /// Items in render order. Order is significant: reordering two items
    /// produces a different fingerprint.
    pub items: Vec<SequenceItem>,
}

// =============================================================================
// Content Snapshot
// =============================================================================

/// Descriptor of the device a snapshot was resolved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeviceDescriptor {
    /// Unique identifier (UUID v4), assigned at pairing.
    pub id: String,

    /// Human-readable device name (e.g., "Lobby Screen 2").
    pub name: String,

    /// Tenant this device belongs to.
    pub tenant_id: String,
}

/// The resolved, ready-to-render payload for one device.
///
/// Produced by the cloud's content-resolution procedure (campaign/scene
/// priority rules run server-side); the player treats it as an opaque,
/// replaceable value. It deliberately carries no resolved-at timestamp:
/// anything volatile would defeat fingerprint-based change detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContentSnapshot {
    /// The device this snapshot was resolved for.
    pub device: DeviceDescriptor,

    /// The active sequence, if any content is scheduled. None renders the
    /// player's idle card.
    pub sequence: Option<ContentSequence>,
}

// =============================================================================
// Device Record (push-channel change events)
// =============================================================================

/// The server-side device row as delivered in push change notifications.
///
/// Refresh notifications carry the row before and after the change; the
/// player derives *why* it should refresh by diffing the two (see
/// [`RefreshReason::from_change`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeviceRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable device name.
    pub name: String,

    /// Sequence currently assigned to this device, if any.
    pub active_sequence_id: Option<String>,

    /// Set by the dashboard's "refresh now" button; each press writes a new
    /// timestamp so consecutive presses are distinguishable.
    #[ts(as = "Option<String>")]
    pub refresh_requested_at: Option<DateTime<Utc>>,

    /// When the row was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Why a push notification asked the player to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RefreshReason {
    /// The assigned sequence changed (content swap).
    SceneChange,

    /// An operator pressed "refresh" in the dashboard.
    RefreshRequested,
}

impl RefreshReason {
    /// Derives the refresh reason from an old/new device record pair.
    ///
    /// Returns None when the change is not render-relevant (e.g., a rename).
    pub fn from_change(old: &DeviceRecord, new: &DeviceRecord) -> Option<RefreshReason> {
        if old.active_sequence_id != new.active_sequence_id {
            return Some(RefreshReason::SceneChange);
        }

        if new.refresh_requested_at.is_some()
            && old.refresh_requested_at != new.refresh_requested_at
        {
            return Some(RefreshReason::RefreshRequested);
        }

        None
    }
}

impl std::fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshReason::SceneChange => write!(f, "scene_change"),
            RefreshReason::RefreshRequested => write!(f, "refresh_requested"),
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Administrative command types the cloud can issue to a device.
///
/// Unrecognized wire values deserialize to `Unknown` rather than failing:
/// a newer dashboard must be able to issue a command an older player rejects
/// with a proper failure report instead of a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandType {
    /// Restart the player process.
    Reboot,

    /// Re-fetch content and re-render.
    Reload,

    /// Drop every entry in the offline content cache.
    ClearCache,

    /// Clear cache and local state, then restart.
    Reset,

    /// Anything this player version does not recognize.
    Unknown(String),
}

impl From<String> for CommandType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "reboot" => CommandType::Reboot,
            "reload" => CommandType::Reload,
            "clear_cache" => CommandType::ClearCache,
            "reset" => CommandType::Reset,
            _ => CommandType::Unknown(s),
        }
    }
}

impl From<CommandType> for String {
    fn from(t: CommandType) -> String {
        t.to_string()
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandType::Reboot => write!(f, "reboot"),
            CommandType::Reload => write!(f, "reload"),
            CommandType::ClearCache => write!(f, "clear_cache"),
            CommandType::Reset => write!(f, "reset"),
            CommandType::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// A server-issued administrative instruction.
///
/// The server creates each command exactly once; the device consumes it at
/// most once effectively and reports exactly one result. The device never
/// mutates `command_type` or `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Unique identifier (UUID v4), minted by the cloud.
    pub id: String,

    /// What to do.
    pub command_type: CommandType,

    /// Optional command-specific parameters.
    pub payload: Option<serde_json::Value>,

    /// When the cloud created the command.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Offline Cache
// =============================================================================

/// Category of a cache entry, stored in the record's `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// Resolved content snapshots.
    Content,

    /// Everything else (device state, bookkeeping).
    Metadata,
}

impl CacheCategory {
    /// Returns the stable string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheCategory::Content => "content",
            CacheCategory::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CacheCategory {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(CacheCategory::Content),
            "metadata" => Ok(CacheCategory::Metadata),
            other => Err(crate::error::CoreError::UnknownCacheCategory(
                other.to_string(),
            )),
        }
    }
}

/// One persisted record in the offline content cache.
///
/// Entries are overwritten on every successful fetch and never expire on
/// their own: staleness is bounded only by how often fetches succeed, which
/// trades "show last-known-good" over "show nothing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Stable key derived from device identity and purpose.
    pub key: String,

    /// The cached payload.
    pub data: serde_json::Value,

    /// Entry category.
    pub category: CacheCategory,

    /// When this entry was written.
    pub stored_at: DateTime<Utc>,
}

/// Returns the cache key for a device's resolved content snapshot.
pub fn content_cache_key(device_id: &str) -> String {
    format!("content-{}", device_id)
}

/// Returns the cache key for a device's bookkeeping metadata.
pub fn device_state_cache_key(device_id: &str) -> String {
    format!("device-state-{}", device_id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sequence: Option<&str>, refresh_at: Option<DateTime<Utc>>) -> DeviceRecord {
        DeviceRecord {
            id: "dev-1".into(),
            name: "Lobby Screen".into(),
            active_sequence_id: sequence.map(String::from),
            refresh_requested_at: refresh_at,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_refresh_reason_scene_change() {
        let old = record(Some("seq-a"), None);
        let new = record(Some("seq-b"), None);
        assert_eq!(
            RefreshReason::from_change(&old, &new),
            Some(RefreshReason::SceneChange)
        );
    }

    #[test]
    fn test_refresh_reason_requested() {
        let old = record(Some("seq-a"), None);
        let new = record(Some("seq-a"), Some(Utc::now()));
        assert_eq!(
            RefreshReason::from_change(&old, &new),
            Some(RefreshReason::RefreshRequested)
        );
    }

    #[test]
    fn test_refresh_reason_rename_is_not_a_refresh() {
        let old = record(Some("seq-a"), None);
        let mut new = record(Some("seq-a"), None);
        new.name = "Lobby Screen (renamed)".into();
        assert_eq!(RefreshReason::from_change(&old, &new), None);
    }

    #[test]
    fn test_scene_change_wins_over_refresh_marker() {
        let old = record(Some("seq-a"), None);
        let new = record(Some("seq-b"), Some(Utc::now()));
        assert_eq!(
            RefreshReason::from_change(&old, &new),
            Some(RefreshReason::SceneChange)
        );
    }

    #[test]
    fn test_command_type_round_trip() {
        let json = r#""clear_cache""#;
        let parsed: CommandType = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, CommandType::ClearCache);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }

    #[test]
    fn test_command_type_unknown_preserved() {
        let parsed: CommandType = serde_json::from_str(r#""frobnicate""#).unwrap();
        assert_eq!(parsed, CommandType::Unknown("frobnicate".into()));
        assert_eq!(parsed.to_string(), "frobnicate");
    }

    #[test]
    fn test_cache_keys_are_device_scoped() {
        assert_eq!(content_cache_key("abc"), "content-abc");
        assert_eq!(device_state_cache_key("abc"), "device-state-abc");
    }

    #[test]
    fn test_cache_category_parse() {
        assert_eq!("content".parse::<CacheCategory>().unwrap(), CacheCategory::Content);
        assert_eq!("metadata".parse::<CacheCategory>().unwrap(), CacheCategory::Metadata);
        assert!("bogus".parse::<CacheCategory>().is_err());
    }
}
