//! # Content Fingerprinting
//!
//! Deterministic digest of a content snapshot, used for change detection.
//!
//! ## Why Fingerprints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Fingerprint-Based Change Detection                   │
//! │                                                                         │
//! │  fetch #1 ──► snapshot A ──► fp("a1b2...")  ──► render                 │
//! │  fetch #2 ──► snapshot A ──► fp("a1b2...")  ──► same fp, skip render   │
//! │  fetch #3 ──► snapshot B ──► fp("9f3e...")  ──► changed, re-render     │
//! │                                                                         │
//! │  Snapshots have no identity of their own: equality IS fingerprint      │
//! │  equality. A push-triggered refresh racing a timer-triggered poll      │
//! │  therefore costs one redundant fetch, never a redundant re-render.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm
//! djb2-xor rolling hash over the snapshot's canonical JSON serialization.
//! Order-sensitive (reordering sequence items changes the digest) and cheap
//! enough to run on every fetch on low-powered display hardware. This is a
//! change detector, not a security primitive: collision avoidance is all
//! that's required.

use crate::types::ContentSnapshot;

/// djb2 seed.
const HASH_SEED: u64 = 5381;

/// Computes the rolling hash of a byte string.
///
/// Classic djb2-xor: `h = h * 33 ^ byte`, wrapping arithmetic.
fn rolling_hash(bytes: &[u8]) -> u64 {
    let mut hash = HASH_SEED;
    for &b in bytes {
        hash = hash.wrapping_mul(33) ^ u64::from(b);
    }
    hash
}

/// Computes the fingerprint of a content snapshot.
///
/// Deterministic: the same snapshot always yields the same 16-hex-digit
/// string, across processes and restarts. serde_json serializes struct
/// fields in declaration order, so the canonical form is stable for a
/// given player version.
pub fn fingerprint(snapshot: &ContentSnapshot) -> String {
    let canonical = serde_json::to_vec(snapshot)
        .expect("content snapshot serializes infallibly (plain structs, string keys)");
    format!("{:016x}", rolling_hash(&canonical))
}

// =============================================================================
// Unit Tests
// =============================================================================
