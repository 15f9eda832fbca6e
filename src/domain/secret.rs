//! Login secret normalization
//!
//! The service authenticates with the SHA-1 hex digest of the password. Users may
//! supply either the plaintext or the digest itself.

use sha1::{Digest, Sha1};

/// Length of a SHA-1 digest in hex characters.
pub const SHA1_HEX_LEN: usize = 40;

/// Heuristic check whether `secret` already is a SHA-1 hex digest.
///
/// Detection is by length and hex alphabet only (case-insensitive). A plaintext
/// password that happens to be 40 hex characters is indistinguishable from a digest.
pub fn is_sha1_digest(secret: &str) -> bool {
    secret.len() == SHA1_HEX_LEN && secret.chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize a secret to the digest form sent on login.
///
/// Returns `secret` unchanged if it already looks like a digest, otherwise its
/// lowercase SHA-1 hex digest.
///
/// # Examples
/// ```
/// use cloudland::domain::normalize_secret;
///
/// let digest = normalize_secret("passw0rd");
/// assert_eq!(digest.len(), 40);
/// assert_eq!(normalize_secret(&digest), digest);
/// ```
pub fn normalize_secret(secret: &str) -> String {
    if is_sha1_digest(secret) {
        return secret.to_string();
    }
    let mut hasher = Sha1::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
