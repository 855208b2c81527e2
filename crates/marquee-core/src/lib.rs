//! # marquee-core: Pure Domain Logic for the Marquee Player
//!
//! This crate is the **heart** of the Marquee player sync engine. It contains
//! all domain logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Marquee Player Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Player Shell (renderer)                      │   │
//! │  │    Scene render ──► Offline badge ──► Restart hooks            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 marquee-player (sync engine)                    │   │
//! │  │    heartbeat, command poll, content fetch, push channels        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ marquee-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐ ┌─────────────┐ ┌───────────┐ ┌────────────┐  │   │
//! │  │   │   types   │ │ fingerprint │ │  backoff  │ │ validation │  │   │
//! │  │   │ Snapshot  │ │ rolling     │ │ exp + 20% │ │ structural │  │   │
//! │  │   │ Command   │ │ digest      │ │ jitter    │ │ checks     │  │   │
//! │  │   └───────────┘ └─────────────┘ └───────────┘ └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 marquee-db (offline cache layer)                │   │
//! │  │          SQLite store that survives process restarts            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (ContentSnapshot, Command, DeviceRecord, etc.)
//! - [`fingerprint`] - Deterministic content digest for change detection
//! - [`backoff`] - Pure, seedable retry delay policy
//! - [`error`] - Domain error types
//! - [`validation`] - Structural snapshot validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Injected Randomness**: The backoff jitter draw is a parameter, never a global RNG
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use std::time::Duration;
//! use marquee_core::backoff::BackoffPolicy;
//!
//! let policy = BackoffPolicy::default();
//!
//! // Deterministic given a fixed draw: 0.5 means zero jitter
//! let delay = policy.delay_for(2, 0.5);
//! assert_eq!(delay, Duration::from_millis(4000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backoff;
pub mod error;
pub mod fingerprint;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use marquee_core::ContentSnapshot` instead of
// `use marquee_core::types::ContentSnapshot`

pub use backoff::BackoffPolicy;
pub use error::{CoreError, ValidationError};
pub use fingerprint::fingerprint;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID for single-tenant player builds.
///
/// ## Why a constant?
/// The cloud schema is multi-tenant, but a paired player belongs to exactly
/// one tenant. Self-hosted builds that skip pairing use this placeholder and
/// the cloud resolves the real tenant from the device token.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum items accepted in a single content sequence.
///
/// ## Operational Reason
/// A runaway sequence (thousands of items) would make every fingerprint and
/// render pass proportionally slower on low-powered display hardware.
pub const MAX_SEQUENCE_ITEMS: usize = 500;
