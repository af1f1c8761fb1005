//! Quorum Wallet: threshold multi-signature wallets in Rust
//!
//! This crate provides a multi-party authorization engine featuring:
//! - Owner sets with an M-of-N quorum threshold
//! - ECDSA signature recovery (secp256k1) with strictly ascending signers
//! - Domain-separated, replay-protected transaction digests
//! - Revenue sharing between approvers and executors
//! - All-or-nothing withdrawal settlement
//! - A wallet factory with an owner index
//! - An in-memory devnet host with JSON persistence
//!
//! # Example
//!
//! ```rust
//! use quorum_wallet::config::EngineConfig;
//! use quorum_wallet::crypto::{KeyPair, Secp256k1Recovery};
//! use quorum_wallet::host::{Host, LocalChain};
//! use quorum_wallet::multisig::{Action, MultisigManager, ProposedAction};
//!
//! let mut chain = LocalChain::default();
//! let mut manager = MultisigManager::with_config(&EngineConfig::default());
//!
//! // A 1-of-1 wallet holding 100 units
//! let key = KeyPair::generate();
//! let wallet = manager.create_wallet("demo", vec![key.identity()], 1, None).unwrap();
//! chain.mint(&wallet, 100).unwrap();
//!
//! // Sign the digest for the current nonce and execute
//! let recipient = KeyPair::generate().identity();
//! let action = Action::Call(ProposedAction::transfer(recipient, 25));
//! let digest = manager.get_wallet(&wallet).unwrap().transaction_hash(chain.chain_id(), &action);
//! let signatures = vec![key.sign(digest.as_bytes())];
//!
//! manager
//!     .execute(&mut chain, &Secp256k1Recovery, key.identity(), &wallet, action, &signatures)
//!     .unwrap();
//! assert_eq!(chain.balance_of(&recipient), 25);
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod host;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use crypto::{KeyPair, Secp256k1Recovery, SignatureRecovery};
pub use host::{Environment, Host, LocalChain, OwnerRegistry, RevenueHandle, RevenueSource};
pub use multisig::{
    Action, Identity, MultisigError, MultisigManager, MultisigWallet, ProposedAction, TxDigest,
};
pub use storage::{Storage, StorageConfig, StorageError};
