//! # marquee-player: Sync Engine for the Marquee Player
//!
//! This crate keeps an unattended display showing the content the server
//! intends: it survives indefinite network outages without freezing the
//! display, executes remote administrative commands safely, and reconciles
//! push-based and poll-based update signals without duplicate or lost work.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Player Sync Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   PlayerAgent (Main Orchestrator)                │  │
//! │  │                                                                  │  │
//! │  │  Embedded in the player shell process                            │  │
//! │  │  Owns lifecycle, timers, and push attachment                     │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ ContentFetcher │  │ PushManager    │  │ CommandDispatcher      │    │
//! │  │                │  │                │  │                        │    │
//! │  │ live fetch →   │  │ WS channels    │  │ poll + push funnel,    │    │
//! │  │ cache fallback │  │ keyed by       │  │ in-flight dedup,       │    │
//! │  │ → fingerprint  │  │ (concern,      │  │ exactly-once result    │    │
//! │  │                │  │  scope id)     │  │ reporting              │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │         │                     │                                         │
//! │         ▼                     ▼                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                │
//! │  │ marquee-db     │  │ Connectivity   │                                │
//! │  │ offline cache  │  │ Monitor        │                                │
//! │  │ (last-known-   │  │ online/offline/│                                │
//! │  │  good content) │  │ reconnecting   │                                │
//! │  └────────────────┘  └────────────────┘                                │
//! │                                                                         │
//! │  LIVENESS GUARANTEES                                                   │
//! │  ───────────────────                                                   │
//! │  • Every retry loop is bounded (attempt cap or delay ceiling)          │
//! │  • Push is an optimization: poll paths alone keep a device alive       │
//! │  • Nothing in this crate terminates the host process                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - Main `PlayerAgent` orchestrator and event emitter trait
//! - [`api`] - Cloud API trait + gRPC client
//! - [`commands`] - Command dispatcher with exactly-once reporting
//! - [`config`] - Player configuration (device id, intervals, push)
//! - [`connectivity`] - Tri-state connection status with observers
//! - [`error`] - Player error types
//! - [`fetcher`] - Content fetch with offline fallback
//! - [`proto`] - Generated gRPC client stubs
//! - [`push`] - Push subscription manager with dedup and capped reconnect
//!
//! ## Usage
//!
//! ```rust,ignore
//! use marquee_player::{PlayerAgent, PlayerConfig};
//!
//! let config = PlayerConfig::load_or_default(None);
//! let agent = PlayerAgent::new(config)?;
//!
//! agent.start().await?;
//!
//! // ... the shell renders; the engine keeps content fresh ...
//!
//! let status = agent.status();
//! println!("online: {}", status.connection_status);
//!
//! agent.stop();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod api;
pub mod commands;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod fetcher;
pub mod proto;
pub mod push;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{NoOpEmitter, PlayerAgent, PlayerAgentBuilder, PlayerEventEmitter, PlayerStatus};
pub use api::{CloudApi, DeviceStatusAck, PlayerApi};
pub use commands::CommandDispatcher;
pub use config::PlayerConfig;
pub use connectivity::{ConnectionStatus, ConnectivityMonitor, StatusSubscription};
pub use error::{PlayerError, PlayerResult};
pub use fetcher::{ContentFetcher, FetchOutcome};
pub use push::{ChannelKey, ChannelOpener, Concern, PushManager, PushMessage, PushSubscription};
