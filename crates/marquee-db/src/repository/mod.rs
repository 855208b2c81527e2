//! # Repository Module
//!
//! Database repository implementations for the offline content cache.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  ContentFetcher / CommandDispatcher                                    │
//! │       │                                                                 │
//! │       │  store.cache().get("content-dev-1")                            │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  CacheRepository                                                       │
//! │  ├── put(&self, key, value, category)                                  │
//! │  ├── get(&self, key)                                                   │
//! │  ├── clear(&self)                                                      │
//! │  └── count(&self) / keys_by_category(&self, category)                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • The sync engine never sees a row, only typed entries                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`cache::CacheRepository`] - Offline cache put/get/clear

pub mod cache;
