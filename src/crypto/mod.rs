//! Cryptographic utilities for the wallet engine
//!
//! This module provides:
//! - SHA-256 and HASH160 hashing
//! - Recoverable ECDSA signatures (secp256k1)
//! - The signature-recovery capability used by the verifier

pub mod hash;
pub mod keys;

pub use hash::{hash160, sha256};
pub use keys::{
    identity_from_public_key, recover_identity, sign_digest, KeyError,
    KeyPair, Secp256k1Recovery, SignatureRecovery, SIGNATURE_LEN,
};
