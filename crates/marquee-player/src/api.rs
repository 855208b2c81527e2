//! # Cloud API Client
//!
//! The player's view of the server-side content-resolution collaborator.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cloud API Boundary                               │
//! │                                                                         │
//! │  ┌────────────────────────────────────────────────────────────────────┐│
//! │  │                     PlayerApi (trait)                              ││
//! │  │                                                                    ││
//! │  │  heartbeat(device_id)                                              ││
//! │  │  get_content(device_id)            → ContentSnapshot               ││
//! │  │  poll_command(device_id)           → Option<Command>               ││
//! │  │  report_command_result(id, ok, msg)                                ││
//! │  │  update_device_status(id, ver, fp) → { needs_screenshot_update }   ││
//! │  └───────────────────────────┬────────────────────────────────────────┘│
//! │                              │                                          │
//! │        ┌─────────────────────┴───────────────────┐                      │
//! │        ▼                                         ▼                      │
//! │  ┌──────────────────┐                 ┌─────────────────────┐          │
//! │  │  CloudApi        │                 │  test fakes         │          │
//! │  │  (production)    │                 │  (in #[cfg(test)])  │          │
//! │  │                  │                 └─────────────────────┘          │
//! │  │  gRPC over HTTP/2│                                                  │
//! │  │  Bearer token    │                                                  │
//! │  │  from pairing    │                                                  │
//! │  └──────────────────┘                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Content resolution runs cloud-side; `get_content` returns an already
//! resolved snapshot. The trait seam exists so every engine component can be
//! driven by an in-process fake in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

use crate::config::ApiSettings;
use crate::error::{PlayerError, PlayerResult};
use crate::proto;
use crate::proto::player_service_client::PlayerServiceClient;
use marquee_core::{
    Command, CommandType, ContentSequence, ContentSnapshot, DeviceDescriptor, ItemKind,
    SequenceItem,
};

// =============================================================================
// Player API Trait
// =============================================================================

/// Acknowledgement of an extended heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatusAck {
    /// The dashboard requested a fresh screenshot of this display.
    pub needs_screenshot_update: bool,
}

/// The server-side collaborator consumed by the sync engine.
///
/// All methods are request/response; push notifications travel over the
/// separate channel facility in [`crate::push`].
#[async_trait]
pub trait PlayerApi: Send + Sync {
    /// Liveness ping. Callers treat errors as log-only.
    async fn heartbeat(&self, device_id: &str) -> PlayerResult<()>;

    /// Fetches the resolved content snapshot for a device.
    ///
    /// Fails on device-not-found or transport failure.
    async fn get_content(&self, device_id: &str) -> PlayerResult<ContentSnapshot>;

    /// Polls for the next pending command, if any.
    async fn poll_command(&self, device_id: &str) -> PlayerResult<Option<Command>>;

    /// Reports a command outcome. Called exactly once per dispatch.
    async fn report_command_result(
        &self,
        command_id: &str,
        success: bool,
        error_message: Option<&str>,
    ) -> PlayerResult<()>;

    /// Extended heartbeat: liveness + player version + content fingerprint.
    async fn update_device_status(
        &self,
        device_id: &str,
        player_version: &str,
        content_fingerprint: &str,
    ) -> PlayerResult<DeviceStatusAck>;
}

// =============================================================================
// Cloud API (production gRPC client)
// =============================================================================

/// gRPC client for the cloud API.
///
/// The underlying HTTP/2 channel is opened lazily on first use and reused;
/// tonic transparently re-establishes a dropped connection, so a transient
/// failure surfaces as a retryable error on the affected call rather than a
/// dead client.
pub struct CloudApi {
    config: ApiSettings,
    bearer: MetadataValue<tonic::metadata::Ascii>,
    channel: Arc<RwLock<Option<Channel>>>,
}

impl CloudApi {
    /// Creates a new cloud API client.
    ///
    /// Fails if the pairing-issued device token cannot form a valid
    /// `authorization` header.
    pub fn new(config: ApiSettings) -> PlayerResult<Self> {
        let bearer: MetadataValue<_> = format!("Bearer {}", config.device_token)
            .parse()
            .map_err(|_| {
                PlayerError::InvalidConfig("device token is not a valid header value".into())
            })?;

        Ok(CloudApi {
            config,
            bearer,
            channel: Arc::new(RwLock::new(None)),
        })
    }

    /// Returns the shared channel, connecting on first use.
    async fn channel(&self) -> PlayerResult<Channel> {
        if let Some(channel) = self.channel.read().await.clone() {
            return Ok(channel);
        }

        let mut slot = self.channel.write().await;
        // Another caller may have connected while we waited for the lock
        if let Some(channel) = slot.clone() {
            return Ok(channel);
        }

        info!(url = %self.config.cloud_url, "Connecting to cloud API");

        let endpoint = Endpoint::from_shared(self.config.cloud_url.clone())
            .map_err(|e| PlayerError::InvalidUrl(e.to_string()))?
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_secs))
            .timeout(Duration::from_secs(self.config.request_timeout_secs));

        let channel = endpoint.connect().await?;

        info!("Connected to cloud API");
        *slot = Some(channel.clone());
        Ok(channel)
    }
}

#[async_trait]
impl PlayerApi for CloudApi {
    async fn heartbeat(&self, device_id: &str) -> PlayerResult<()> {
        let channel = self.channel().await?;
        let bearer = self.bearer.clone();
        let mut client = PlayerServiceClient::with_interceptor(
            channel,
            move |mut req: tonic::Request<()>| {
                req.metadata_mut().insert("authorization", bearer.clone());
                Ok(req)
            },
        );

        client
            .heartbeat(proto::HeartbeatRequest {
                device_id: device_id.to_string(),
            })
            .await?;

        debug!("Heartbeat acknowledged");
        Ok(())
    }

    async fn get_content(&self, device_id: &str) -> PlayerResult<ContentSnapshot> {
        let channel = self.channel().await?;
        let bearer = self.bearer.clone();
        let mut client = PlayerServiceClient::with_interceptor(
            channel,
            move |mut req: tonic::Request<()>| {
                req.metadata_mut().insert("authorization", bearer.clone());
                Ok(req)
            },
        );

        let response = client
            .get_content(proto::GetContentRequest {
                device_id: device_id.to_string(),
            })
            .await?;

        let snapshot = response
            .into_inner()
            .snapshot
            .ok_or_else(|| PlayerError::DeserializationFailed("empty snapshot".into()))?;

        snapshot_from_proto(snapshot)
    }

    async fn poll_command(&self, device_id: &str) -> PlayerResult<Option<Command>> {
        let channel = self.channel().await?;
        let bearer = self.bearer.clone();
        let mut client = PlayerServiceClient::with_interceptor(
            channel,
            move |mut req: tonic::Request<()>| {
                req.metadata_mut().insert("authorization", bearer.clone());
                Ok(req)
            },
        );

        let response = client
            .poll_command(proto::PollCommandRequest {
                device_id: device_id.to_string(),
            })
            .await?;

        match response.into_inner().command {
            Some(command) => Ok(Some(command_from_proto(command)?)),
            None => Ok(None),
        }
    }

    async fn report_command_result(
        &self,
        command_id: &str,
        success: bool,
        error_message: Option<&str>,
    ) -> PlayerResult<()> {
        let channel = self.channel().await?;
        let bearer = self.bearer.clone();
        let mut client = PlayerServiceClient::with_interceptor(
            channel,
            move |mut req: tonic::Request<()>| {
                req.metadata_mut().insert("authorization", bearer.clone());
                Ok(req)
            },
        );

        client
            .report_command_result(proto::ReportCommandResultRequest {
                command_id: command_id.to_string(),
                success,
                error_message: error_message.unwrap_or_default().to_string(),
            })
            .await?;

        debug!(command_id = %command_id, success, "Command result reported");
        Ok(())
    }

    async fn update_device_status(
        &self,
        device_id: &str,
        player_version: &str,
        content_fingerprint: &str,
    ) -> PlayerResult<DeviceStatusAck> {
        let channel = self.channel().await?;
        let bearer = self.bearer.clone();
        let mut client = PlayerServiceClient::with_interceptor(
            channel,
            move |mut req: tonic::Request<()>| {
                req.metadata_mut().insert("authorization", bearer.clone());
                Ok(req)
            },
        );

        let response = client
            .update_device_status(proto::UpdateDeviceStatusRequest {
                device_id: device_id.to_string(),
                player_version: player_version.to_string(),
                content_fingerprint: content_fingerprint.to_string(),
            })
            .await?;

        Ok(DeviceStatusAck {
            needs_screenshot_update: response.into_inner().needs_screenshot_update,
        })
    }
}

// =============================================================================
// Proto Conversion Helpers
// =============================================================================

/// Convert a proto::ContentSnapshot to a marquee_core::ContentSnapshot.
///
/// # Field Mapping
/// ```text
/// proto::ContentSnapshot    →  marquee_core::ContentSnapshot
/// ────────────────────────────────────────────────────────────
/// device                    →  device (required)
/// sequence                  →  sequence (optional = idle card)
/// item.kind (string)        →  ItemKind (rejects unknown kinds)
/// item.width/height (0)     →  None (fit to screen)
/// ```
pub fn snapshot_from_proto(snapshot: proto::ContentSnapshot) -> PlayerResult<ContentSnapshot> {
    let device = snapshot
        .device
        .ok_or_else(|| PlayerError::DeserializationFailed("snapshot without device".into()))?;

    let sequence = snapshot.sequence.map(sequence_from_proto).transpose()?;

    Ok(ContentSnapshot {
        device: DeviceDescriptor {
            id: device.id,
            name: device.name,
            tenant_id: device.tenant_id,
        },
        sequence,
    })
}

fn sequence_from_proto(sequence: proto::ContentSequence) -> PlayerResult<ContentSequence> {
    let items = sequence
        .items
        .into_iter()
        .map(item_from_proto)
        .collect::<PlayerResult<Vec<_>>>()?;

    Ok(ContentSequence {
        id: sequence.id,
        name: sequence.name,
        items,
    })
}

fn item_from_proto(item: proto::SequenceItem) -> PlayerResult<SequenceItem> {
    let kind = match item.kind.as_str() {
        "image" => ItemKind::Image,
        "video" => ItemKind::Video,
        "web" => ItemKind::Web,
        other => {
            return Err(PlayerError::DeserializationFailed(format!(
                "unknown item kind '{}' for item {}",
                other, item.id
            )))
        }
    };

    Ok(SequenceItem {
        id: item.id,
        kind,
        source: item.source,
        duration_secs: item.duration_secs,
        width: (item.width > 0).then_some(item.width),
        height: (item.height > 0).then_some(item.height),
    })
}

/// Convert a proto::Command to a marquee_core::Command.
///
/// # Field Mapping
/// ```text
/// proto::Command            →  marquee_core::Command
/// ────────────────────────────────────────────────────
/// id                        →  id
/// command_type (string)     →  CommandType (unknown values preserved)
/// payload_json ("")         →  None
/// payload_json (JSON text)  →  Some(Value)
/// created_at                →  created_at (RFC3339)
/// ```
pub fn command_from_proto(command: proto::Command) -> PlayerResult<Command> {
    let payload = if command.payload_json.is_empty() {
        None
    } else {
        Some(serde_json::from_str(&command.payload_json)?)
    };

    let created_at = match command.created_at {
        Some(ts) => DateTime::parse_from_rfc3339(&ts.value)
            .map_err(|e| {
                PlayerError::DeserializationFailed(format!(
                    "bad created_at on command {}: {}",
                    command.id, e
                ))
            })?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    Ok(Command {
        id: command.id,
        command_type: CommandType::from(command.command_type),
        payload,
        created_at,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
