//! # Validation Module
//!
//! Structural validation for fetched content snapshots.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Cloud (content resolution)                                   │
//! │  ├── Business rules: campaign priority, scheduling windows             │
//! │  └── Only publishable sequences reach a device                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (player-side structural checks)                  │
//! │  ├── Every item renderable: non-empty source, positive duration        │
//! │  └── A snapshot that fails here is treated as a FAILED FETCH, so the   │
//! │      player keeps its last-known-good content instead of a blank loop  │
//! │                                                                         │
//! │  Defense in depth: a dashboard bug or truncated payload must not put   │
//! │  an unattended display into an unrecoverable render state.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use marquee_core::validation::validate_snapshot;
//!
//! # let snapshot = unimplemented!();
//! validate_snapshot(&snapshot, "device-id").unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::{ContentSnapshot, SequenceItem};
use crate::MAX_SEQUENCE_ITEMS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Snapshot Validators
// =============================================================================

/// Validates a freshly fetched snapshot before it is accepted.
///
/// ## Rules
/// - The snapshot must belong to the expected device
/// - The sequence (when present) must fit the item budget
/// - Every item must pass [`validate_item`]
///
/// A `None` sequence is valid: it renders the idle card.
pub fn validate_snapshot(
    snapshot: &ContentSnapshot,
    expected_device_id: &str,
) -> ValidationResult<()> {
    if snapshot.device.id != expected_device_id {
        return Err(ValidationError::DeviceMismatch {
            snapshot_device: snapshot.device.id.clone(),
            expected_device: expected_device_id.to_string(),
        });
    }

    if let Some(ref sequence) = snapshot.sequence {
        if sequence.items.len() > MAX_SEQUENCE_ITEMS {
            return Err(ValidationError::TooManyItems {
                count: sequence.items.len(),
                max: MAX_SEQUENCE_ITEMS,
            });
        }

        for item in &sequence.items {
            validate_item(item)?;
        }
    }

    Ok(())
}

/// Validates a single sequence item.
///
/// ## Rules
/// - Source locator must not be empty
/// - Duration must be positive
/// - Explicit dimensions, when present, must be positive
pub fn validate_item(item: &SequenceItem) -> ValidationResult<()> {
    if item.source.trim().is_empty() {
        return Err(ValidationError::EmptySource {
            item_id: item.id.clone(),
        });
    }

    if item.duration_secs == 0 {
        return Err(ValidationError::ZeroDuration {
            item_id: item.id.clone(),
        });
    }

    if item.width == Some(0) {
        return Err(ValidationError::ZeroDimension {
            item_id: item.id.clone(),
            dimension: "width".to_string(),
        });
    }

    if item.height == Some(0) {
        return Err(ValidationError::ZeroDimension {
            item_id: item.id.clone(),
            dimension: "height".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
