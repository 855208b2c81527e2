//! # marquee-db: Offline Cache Layer for the Marquee Player
//!
//! This crate provides the persistent offline content cache for the player.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Marquee Player Data Flow                           │
//! │                                                                         │
//! │  ContentFetcher (marquee-player)                                       │
//! │       │                                                                 │
//! │       │  fetch OK  ──► put('content-<deviceId>', snapshot)             │
//! │       │  fetch ERR ──► get('content-<deviceId>') → last-known-good     │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     marquee-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  CacheStore   │    │  Repository   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (cache.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ put/get/clear │    │ 001_offline_ │  │   │
//! │  │   │ WAL mode      │    │ count/keys    │    │ cache.sql    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/marquee-player/cache.db (Linux)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Cache error types
//! - [`repository`] - Cache repository implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use marquee_db::{CacheStore, CacheConfig};
//! use marquee_core::CacheCategory;
//!
//! // Open the cache with default config
//! let config = CacheConfig::new("path/to/cache.db");
//! let store = CacheStore::new(config).await?;
//!
//! // Round-trip a snapshot
//! let repo = store.cache();
//! repo.put("content-dev-1", &payload, CacheCategory::Content).await?;
//! let cached = repo.get("content-dev-1").await?;
//! ```
//!
//! ## Failure Policy
//! This crate returns typed [`CacheError`]s; it is the *caller's* contract
//! (marquee-player) that any storage failure is logged and treated as a cache
//! miss or no-op, never a crash of the sync engine.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{CacheError, CacheResult};
pub use pool::{CacheConfig, CacheStore};
pub use repository::cache::CacheRepository;
