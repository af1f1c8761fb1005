//! ECDSA key management for the wallet engine
//!
//! Provides key pair generation, recoverable signing and public key
//! recovery using the secp256k1 elliptic curve.

use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::hash160;
use crate::multisig::Identity;

/// Length of a recoverable compact signature: 64 bytes of (r, s) plus the recovery id
pub const SIGNATURE_LEN: usize = 65;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid signature encoding: {0}")]
    InvalidSignature(String),
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// Capability that maps a (digest, signature) pair back to the signing identity
pub trait SignatureRecovery {
    fn recover(&self, digest: &[u8; 32], signature: &[u8]) -> Result<Identity, KeyError>;
}

/// Default recovery backed by secp256k1 public key recovery
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Recovery;

impl SignatureRecovery for Secp256k1Recovery {
    fn recover(&self, digest: &[u8; 32], signature: &[u8]) -> Result<Identity, KeyError> {
        recover_identity(digest, signature)
    }
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key.trim_start_matches("0x"))
            .map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// The identity controlled by this key
    pub fn identity(&self) -> Identity {
        identity_from_public_key(&self.public_key)
    }

    /// Produce a recoverable signature over a 32-byte digest
    pub fn sign(&self, digest: &[u8; 32]) -> Vec<u8> {
        sign_digest(&self.secret_key, digest)
    }
}

/// Derive an identity as HASH160 of the compressed public key
pub fn identity_from_public_key(public_key: &PublicKey) -> Identity {
    Identity::new(hash160(&public_key.serialize()))
}

/// Sign a digest, returning `r || s || recovery_id`
pub fn sign_digest(secret_key: &SecretKey, digest: &[u8; 32]) -> Vec<u8> {
    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut signature = Vec::with_capacity(SIGNATURE_LEN);
    signature.extend_from_slice(&compact);
    signature.push(recovery_id.to_i32() as u8);
    signature
}

/// Recover the signing identity from a digest and a 65-byte signature
pub fn recover_identity(digest: &[u8; 32], signature: &[u8]) -> Result<Identity, KeyError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(KeyError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_LEN,
            signature.len()
        )));
    }

    let recovery_id = RecoveryId::from_i32(i32::from(signature[64]))
        .map_err(|_| KeyError::InvalidSignature("bad recovery id".to_string()))?;
    let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id)?;

    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let public_key = secp.recover_ecdsa(&message, &recoverable)?;

    Ok(identity_from_public_key(&public_key))
}
