//! Content fingerprint newtype.

use serde::{Deserialize, Serialize};

/// Hex digest identifying stored content.
///
/// The fingerprint is the sole deduplication key. It is always lowercase hex
/// and at least three characters long, so the two-character shard and the
/// remainder are both non-empty.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hex-encode a raw digest.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(digest.iter().map(|byte| format!("{:02x}", byte)).collect())
    }

    /// Parse a stored hex digest. Uppercase input is normalised.
    pub fn parse(hex: &str) -> Option<Self> {
        if hex.len() < 3 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(hex.to_ascii_lowercase()))
    }

    /// The digest as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-character directory shard.
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }

    /// Everything after the shard.
    pub fn remainder(&self) -> &str {
        &self.0[2..]
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Fingerprint::parse(&value).ok_or_else(|| format!("Invalid fingerprint: {}", value))
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_digest_is_lowercase_hex() {
        let fp = Fingerprint::from_digest(&[0xAB, 0x01, 0xFF]);
        assert_eq!(fp.as_str(), "ab01ff");
        assert_eq!(fp.shard(), "ab");
        assert_eq!(fp.remainder(), "01ff");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Fingerprint::parse("ab").is_none());
        assert!(Fingerprint::parse("xyz123").is_none());
        assert_eq!(Fingerprint::parse("ABCDEF").unwrap().as_str(), "abcdef");
    }
}
