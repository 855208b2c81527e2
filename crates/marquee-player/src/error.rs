//! # Player Error Types
//!
//! Error types for the sync engine.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Player Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Content             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  NoContent              │ │
//! │  │  MissingDeviceId│  │  Disconnected   │  │  InvalidSnapshot        │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  DeserializationFailed  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Commands     │  │   Push Channel  │  │      Storage            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  UnknownCommand │  │  ChannelLost    │  │  Cache (contained:      │ │
//! │  │  CommandFailed  │  │  SubscribeFailed│  │  logged, never a crash) │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Policy
//! Failures local to one boundary (cache, one push channel, one command) are
//! contained and reported at that boundary. Only a fully exhausted content
//! fetch reaches the agent's event emitter. Nothing in this crate terminates
//! the host process.

use thiserror::Error;

/// Result type alias for player operations.
pub type PlayerResult<T> = Result<T, PlayerError>;

/// Player error type covering all sync-engine failures.
///
/// ## Design Principles
/// - Each variant includes enough context for debugging
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum PlayerError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid player configuration.
    #[error("Invalid player configuration: {0}")]
    InvalidConfig(String),

    /// Missing device ID (required; assigned at pairing).
    #[error("Device ID not configured. Pair this display first.")]
    MissingDeviceId,

    /// Invalid cloud or realtime URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Failed to reach the cloud API.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection dropped mid-request.
    #[error("Disconnected from cloud")]
    Disconnected,

    /// Request or connection timeout.
    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    /// The cloud rejected or failed a request.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    // =========================================================================
    // Content Errors
    // =========================================================================
    /// No content available: the live fetch failed and nothing is cached.
    ///
    /// This is the terminal fetch failure; the agent surfaces it to the
    /// error callback and tries again on the next scheduled cycle.
    #[error("No content available: live fetch failed and the offline cache is empty")]
    NoContent,

    /// A fetched snapshot failed structural validation.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(#[from] marquee_core::ValidationError),

    /// Failed to decode a payload.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Failed to encode a payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Command Errors
    // =========================================================================
    /// The command type is not recognized by this player version.
    #[error("Unknown command type: {0}")]
    UnknownCommand(String),

    /// A command handler failed.
    #[error("Command {id} failed: {message}")]
    CommandFailed { id: String, message: String },

    // =========================================================================
    // Push Channel Errors
    // =========================================================================
    /// A push channel could not be opened.
    #[error("Failed to open push channel '{channel}': {message}")]
    SubscribeFailed { channel: String, message: String },

    /// A push channel dropped.
    #[error("Push channel '{0}' lost")]
    ChannelLost(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Offline cache failure. Contained at the call site: logged and treated
    /// as a cache miss / no-op.
    #[error("Cache error: {0}")]
    Cache(#[from] marquee_db::CacheError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal engine error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Internal channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for PlayerError {
    fn from(err: serde_json::Error) -> Self {
        PlayerError::DeserializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for PlayerError {
    fn from(err: url::ParseError) -> Self {
        PlayerError::InvalidUrl(err.to_string())
    }
}

impl From<tonic::Status> for PlayerError {
    fn from(status: tonic::Status) -> Self {
        use tonic::Code;
        match status.code() {
            Code::Unavailable => PlayerError::Disconnected,
            Code::DeadlineExceeded => PlayerError::Timeout(0),
            _ => PlayerError::RequestFailed(format!("{}: {}", status.code(), status.message())),
        }
    }
}

impl From<tonic::transport::Error> for PlayerError {
    fn from(err: tonic::transport::Error) -> Self {
        PlayerError::ConnectionFailed(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for PlayerError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => PlayerError::Disconnected,
            WsError::Io(io) => PlayerError::ConnectionFailed(io.to_string()),
            other => PlayerError::ConnectionFailed(other.to_string()),
        }
    }
}

impl From<std::io::Error> for PlayerError {
    fn from(err: std::io::Error) -> Self {
        PlayerError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for PlayerError {
    fn from(err: toml::de::Error) -> Self {
        PlayerError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for PlayerError {
    fn from(err: toml::ser::Error) -> Self {
        PlayerError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl PlayerError {
    /// Returns true if this error is recoverable and the operation can be retried.
    ///
    /// ## Retryable Errors
    /// - Connection failures (network issues)
    /// - Timeouts
    /// - Temporary disconnections and dropped channels
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Unknown commands
    /// - Terminal no-content state (retried on the next cycle, not inline)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlayerError::ConnectionFailed(_)
                | PlayerError::Disconnected
                | PlayerError::Timeout(_)
                | PlayerError::RequestFailed(_)
                | PlayerError::ChannelLost(_)
                | PlayerError::SubscribeFailed { .. }
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PlayerError::InvalidConfig(_)
                | PlayerError::MissingDeviceId
                | PlayerError::InvalidUrl(_)
                | PlayerError::ConfigLoadFailed(_)
                | PlayerError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PlayerError::ConnectionFailed("network error".into()).is_retryable());
        assert!(PlayerError::Disconnected.is_retryable());
        assert!(PlayerError::Timeout(30).is_retryable());
        assert!(PlayerError::ChannelLost("commands:dev-1".into()).is_retryable());

        assert!(!PlayerError::InvalidConfig("bad config".into()).is_retryable());
        assert!(!PlayerError::NoContent.is_retryable());
        assert!(!PlayerError::UnknownCommand("frobnicate".into()).is_retryable());
    }

    #[test]
    fn test_unknown_command_message() {
        let err = PlayerError::UnknownCommand("frobnicate".into());
        assert!(err.to_string().contains("Unknown command type"));
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn test_grpc_status_mapping() {
        let err: PlayerError = tonic::Status::unavailable("down").into();
        assert!(matches!(err, PlayerError::Disconnected));

        let err: PlayerError = tonic::Status::not_found("no such device").into();
        assert!(matches!(err, PlayerError::RequestFailed(_)));
        assert!(!err.is_config_error());
    }
}
