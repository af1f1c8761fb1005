//! Proposed actions and their replay-resistant digests
//!
//! A digest binds the chain id, the wallet identity and the nonce to the
//! call parameters, so a signature is only good for one instance, one
//! environment and one position in the wallet's history.

use crate::crypto::sha256;
use crate::multisig::Identity;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Domain tag prefixed to every transaction preimage
pub const TX_DOMAIN: &[u8] = b"QUORUM-WALLET/TX/v1";

const TAG_ADD_OWNER: u8 = 0x01;
const TAG_REMOVE_OWNER: u8 = 0x02;
const TAG_CHANGE_THRESHOLD: u8 = 0x03;

/// A 32-byte transaction digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxDigest([u8; 32]);

impl TxDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(text: &str) -> Option<Self> {
        let bytes = hex::decode(text.trim().trim_start_matches("0x")).ok()?;
        let array: [u8; 32] = bytes.as_slice().try_into().ok()?;
        Some(Self(array))
    }
}

impl From<[u8; 32]> for TxDigest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxDigest({})", self)
    }
}

impl Serialize for TxDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TxDigest::from_hex(&text).ok_or_else(|| serde::de::Error::custom("invalid digest"))
    }
}

/// An outbound call: destination, native value and opaque payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub destination: Identity,
    pub value: u64,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

impl ProposedAction {
    pub fn new(destination: Identity, value: u64, payload: Vec<u8>) -> Self {
        Self {
            destination,
            value,
            payload,
        }
    }

    /// A plain value transfer with no payload
    pub fn transfer(destination: Identity, value: u64) -> Self {
        Self::new(destination, value, Vec::new())
    }
}

/// Something a quorum of owners can authorize
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Forward a call to an external destination
    Call(ProposedAction),
    AddOwner { owner: Identity, threshold: usize },
    RemoveOwner { owner: Identity, threshold: usize },
    ChangeThreshold { threshold: usize },
}

impl Action {
    pub fn is_admin(&self) -> bool {
        !matches!(self, Action::Call(_))
    }

    /// The call this action is hashed as
    ///
    /// Administrative actions are calls to the wallet itself with zero value
    /// and a tagged payload.
    pub fn to_call(&self, wallet: &Identity) -> ProposedAction {
        match self {
            Action::Call(call) => call.clone(),
            _ => ProposedAction::new(*wallet, 0, self.admin_payload()),
        }
    }

    fn admin_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(1 + 20 + 8);
        match self {
            Action::Call(_) => {}
            Action::AddOwner { owner, threshold } => {
                payload.push(TAG_ADD_OWNER);
                payload.extend_from_slice(owner.as_bytes());
                payload.extend_from_slice(&(*threshold as u64).to_be_bytes());
            }
            Action::RemoveOwner { owner, threshold } => {
                payload.push(TAG_REMOVE_OWNER);
                payload.extend_from_slice(owner.as_bytes());
                payload.extend_from_slice(&(*threshold as u64).to_be_bytes());
            }
            Action::ChangeThreshold { threshold } => {
                payload.push(TAG_CHANGE_THRESHOLD);
                payload.extend_from_slice(&(*threshold as u64).to_be_bytes());
            }
        }
        payload
    }
}

impl From<ProposedAction> for Action {
    fn from(call: ProposedAction) -> Self {
        Action::Call(call)
    }
}

/// Derive the digest owners sign for a call at a given nonce
pub fn transaction_hash(
    chain_id: u64,
    wallet: &Identity,
    nonce: u64,
    call: &ProposedAction,
) -> TxDigest {
    // chain id, wallet, nonce, destination, value, payload length
    let mut preimage = Vec::with_capacity(TX_DOMAIN.len() + 72 + call.payload.len());
    preimage.extend_from_slice(TX_DOMAIN);
    preimage.extend_from_slice(&chain_id.to_be_bytes());
    preimage.extend_from_slice(wallet.as_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    preimage.extend_from_slice(call.destination.as_bytes());
    preimage.extend_from_slice(&call.value.to_be_bytes());
    preimage.extend_from_slice(&(call.payload.len() as u64).to_be_bytes());
    preimage.extend_from_slice(&call.payload);

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&sha256(&preimage));
    TxDigest(digest)
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> Identity {
        Identity::new([byte; 20])
    }

    fn sample_call() -> ProposedAction {
        ProposedAction::new(id(0xd), 1_000, vec![1, 2, 3])
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = transaction_hash(1, &id(1), 0, &sample_call());
        let b = transaction_hash(1, &id(1), 0, &sample_call());
        assert_eq!(a, b);
    }

    #[test]
    fn test_nonce_changes_digest() {
        let a = transaction_hash(1, &id(1), 0, &sample_call());
        let b = transaction_hash(1, &id(1), 1, &sample_call());
        assert_ne!(a, b);
    }

    #[test]
    fn test_instance_and_chain_are_bound() {
        let base = transaction_hash(1, &id(1), 0, &sample_call());
        assert_ne!(base, transaction_hash(1, &id(2), 0, &sample_call()));
        assert_ne!(base, transaction_hash(2, &id(1), 0, &sample_call()));
    }

    #[test]
    fn test_every_field_is_bound() {
        let base = transaction_hash(1, &id(1), 0, &sample_call());

        let mut other = sample_call();
        other.value += 1;
        assert_ne!(base, transaction_hash(1, &id(1), 0, &other));

        let mut other = sample_call();
        other.destination = id(0xe);
        assert_ne!(base, transaction_hash(1, &id(1), 0, &other));

        let mut other = sample_call();
        other.payload.push(4);
        assert_ne!(base, transaction_hash(1, &id(1), 0, &other));
    }

    #[test]
    fn test_admin_actions_hash_as_self_calls() {
        let wallet = id(1);
        let add = Action::AddOwner {
            owner: id(9),
            threshold: 2,
        };
        let remove = Action::RemoveOwner {
            owner: id(9),
            threshold: 2,
        };

        let call = add.to_call(&wallet);
        assert_eq!(call.destination, wallet);
        assert_eq!(call.value, 0);
        assert_eq!(call.payload[0], TAG_ADD_OWNER);
        assert!(add.is_admin());

        assert_ne!(
            transaction_hash(1, &wallet, 0, &call),
            transaction_hash(1, &wallet, 0, &remove.to_call(&wallet))
        );
    }

    #[test]
    fn test_digest_hex_roundtrip() {
        let digest = transaction_hash(1, &id(1), 0, &sample_call());
        assert_eq!(TxDigest::from_hex(&digest.to_string()), Some(digest));
        assert_eq!(TxDigest::from_hex("0x1234"), None);
    }

    #[test]
    fn test_action_json_shape() {
        let action = Action::Call(sample_call());
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "call");
        assert_eq!(json["payload"], "010203");
    }
}
