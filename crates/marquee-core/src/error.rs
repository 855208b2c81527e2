//! # Error Types
//!
//! Domain-specific error types for marquee-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  marquee-core errors (this file)                                       │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Snapshot validation failures                   │
//! │                                                                         │
//! │  marquee-db errors (separate crate)                                    │
//! │  └── CacheError       - Offline-cache operation failures               │
//! │                                                                         │
//! │  marquee-player errors (separate crate)                                │
//! │  └── PlayerError      - Sync engine failures                           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → PlayerError → emitter/log         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item id, key, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to an actionable log line

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// These represent domain rule violations inside pure code. They are caught
/// at the engine boundary and turned into failure reports or log lines.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cache record carried a `type` column value this build doesn't know.
    ///
    /// ## When This Occurs
    /// - The store was written by a newer player version
    /// - Manual edits to the cache database
    #[error("Unknown cache category: {0}")]
    UnknownCacheCategory(String),

    /// A snapshot could not be serialized for fingerprinting.
    #[error("Snapshot serialization failed: {0}")]
    Serialization(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structural validation errors for fetched content.
///
/// A snapshot that fails these checks is treated as a failed fetch: the
/// player would rather keep showing last-known-good content than render a
/// sequence it cannot play.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A sequence item has no source locator.
    #[error("Sequence item {item_id} has an empty source")]
    EmptySource { item_id: String },

    /// A sequence item would be on screen for zero seconds.
    #[error("Sequence item {item_id} has zero duration")]
    ZeroDuration { item_id: String },

    /// An item declares a zero-pixel render dimension.
    #[error("Sequence item {item_id} has a zero {dimension} dimension")]
    ZeroDimension { item_id: String, dimension: String },

    /// The sequence exceeds the per-device item budget.
    #[error("Sequence has {count} items, maximum is {max}")]
    TooManyItems { count: usize, max: usize },

    /// The snapshot was resolved for a different device.
    #[error("Snapshot is for device {snapshot_device}, expected {expected_device}")]
    DeviceMismatch {
        snapshot_device: String,
        expected_device: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::TooManyItems { count: 900, max: 500 };
        assert_eq!(err.to_string(), "Sequence has 900 items, maximum is 500");

        let err = CoreError::UnknownCacheCategory("blob".to_string());
        assert_eq!(err.to_string(), "Unknown cache category: blob");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::EmptySource {
            item_id: "item-1".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
