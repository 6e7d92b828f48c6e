//! ID generation utilities for iterloop
//!
//! Provides functions for generating loop and node-instance identifiers.

use rand::Rng;

/// Loop id reported when a source has nothing to iterate over.
pub const NO_LOOP_ID: &str = "none";

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique loop ID
///
/// Format: `{timestamp_ms}-{random_hex}`
/// Example: `1738300800123-5f0c2a91d34e7b18`
pub fn generate_loop_id() -> String {
    let timestamp = now_ms();
    let random: u64 = rand::rng().random();
    format!("{}-{:016x}", timestamp, random)
}

/// Generate an identity for a source node instance
///
/// Format: `src-{random_hex}`
pub fn generate_origin_id() -> String {
    let random: u64 = rand::rng().random();
    format!("src-{:016x}", random)
}
