//! Session token generation and hashing.
//!
//! Session tokens are opaque URL-safe strings handed to the client; only
//! their SHA-256 hash is ever stored. Lookups go through the hash, so a
//! datastore leak does not leak usable credentials.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Entropy of a freshly generated session token, in bytes.
pub const TOKEN_BYTES: usize = 32;

/// Generate a new opaque session token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a raw token for storage lookup (lowercase hex).
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
