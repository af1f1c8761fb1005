//! Fixed-width identities for owners, signers and wallet instances

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Byte width of an identity
pub const IDENTITY_LEN: usize = 20;

/// Error parsing an identity from text
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentityParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
    #[error("Invalid length: expected {IDENTITY_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

/// An address-like identity, ordered bytewise
///
/// Serialized as `0x`-prefixed lowercase hex so it can key JSON maps.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity([u8; IDENTITY_LEN]);

impl Identity {
    /// The null identity (all zero bytes)
    pub const ZERO: Identity = Identity([0u8; IDENTITY_LEN]);

    pub const fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; IDENTITY_LEN]
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self)
    }
}

impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(raw).map_err(|e| IdentityParseError::InvalidHex(e.to_string()))?;
        let array: [u8; IDENTITY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdentityParseError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_display_and_parse() {
        let id = Identity::new([0xab; IDENTITY_LEN]);
        let text = id.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + IDENTITY_LEN * 2);
        assert_eq!(text.parse::<Identity>().unwrap(), id);
        // Prefix is optional
        assert_eq!(text[2..].parse::<Identity>().unwrap(), id);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "0x1234".parse::<Identity>(),
            Err(IdentityParseError::InvalidLength(2))
        ));
        assert!(matches!(
            "zz".parse::<Identity>(),
            Err(IdentityParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let mut low = [0u8; IDENTITY_LEN];
        low[0] = 1;
        let mut high = [0u8; IDENTITY_LEN];
        high[0] = 2;
        assert!(Identity::new(low) < Identity::new(high));
        assert!(Identity::ZERO < Identity::new(low));
        assert!(Identity::ZERO.is_zero());
    }

    #[test]
    fn test_json_map_key() {
        let mut map = HashMap::new();
        map.insert(Identity::new([7; IDENTITY_LEN]), 42u64);
        let json = serde_json::to_string(&map).unwrap();
        let back: HashMap<Identity, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
