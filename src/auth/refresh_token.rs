/// Refresh token digests
///
/// The credential store never holds a refresh token in plaintext, only its
/// SHA-256 digest. Two tokens are equal exactly when their digests are.

use sha2::{Digest, Sha256};

/// Hash a refresh token using SHA-256, hex encoded
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
