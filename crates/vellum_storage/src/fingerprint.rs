//! Content fingerprinting.

use sha2::{Digest, Sha256};
use vellum_core::Fingerprint;

/// Compute the SHA-256 fingerprint of `data`.
///
/// Deterministic and side-effect free; 64 lowercase hex characters.
pub fn fingerprint(data: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Fingerprint::from_digest(&hasher.finalize())
}
