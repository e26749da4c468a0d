//! Deterministic remote identity derivation.
//!
//! Both the remote username and the credential UUID are pure functions
//! of the order id. That is what makes re-invoked provisioning
//! idempotent: a retry after a crash or timeout targets exactly the
//! identity the first attempt may already have created, and the remote
//! "already exists" answer can safely be read as success.

use sha2::{Digest, Sha256};
use shared_types::OrderId;
use uuid::Uuid;

/// Derive the remote username for an order: `u-` plus the lowercased
/// order id with every non-alphanumeric squashed to `-`.
pub fn derive_username(order_id: &OrderId) -> String {
    let sanitized: String = order_id
        .as_str()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("u-{sanitized}")
}

/// Derive the credential UUID for an order from a SHA-256 of the order
/// id, with the version/variant bits set so the result is a valid
/// random-format UUID.
pub fn derive_credential(order_id: &OrderId) -> Uuid {
    let digest = Sha256::digest(order_id.as_str().as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    // Version 4, RFC 4122 variant.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}
