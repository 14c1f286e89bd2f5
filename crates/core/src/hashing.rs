//! SHA-256 digests and random one-time tokens.
//!
//! Email verification and password reset tokens are handed to the user in
//! plaintext; only their SHA-256 hex digest is persisted.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated one-time tokens (alphanumeric characters).
pub const TOKEN_LENGTH: usize = 48;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// A freshly generated one-time token.
pub struct GeneratedToken {
    /// Sent to the user exactly once, never stored.
    pub plaintext: String,
    /// SHA-256 hex digest of `plaintext`, stored in the database.
    pub hash: String,
}

/// Generate a random alphanumeric token and its digest.
pub fn generate_token() -> GeneratedToken {
    let plaintext: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let hash = hash_token(&plaintext);
    GeneratedToken { plaintext, hash }
}

/// Digest of a token as presented by a client.
pub fn hash_token(token: &str) -> String {
    sha256_hex(token.trim().as_bytes())
}
