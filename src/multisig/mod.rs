//! Threshold multi-signature wallets with fee sharing
//!
//! A wallet executes an action only when a quorum of its owners has signed
//! the action's digest. Revenue accrued for the wallet is split among the
//! parties that authorized and executed each action, and swept out on
//! withdrawal.

pub mod error;
pub mod events;
pub mod fees;
pub mod identity;
pub mod manager;
pub mod owners;
pub mod settlement;
pub mod transaction;
pub mod verifier;
pub mod wallet;

pub use error::MultisigError;
pub use events::{EventLog, ExecutionRecord, LoggedEvent, WalletEvent};
pub use fees::{
    split_fee, AllocationLedger, FeeSplit, DEFAULT_FEE_PERCENTAGE, MAX_FEE_PERCENTAGE,
};
pub use identity::{Identity, IdentityParseError, IDENTITY_LEN};
pub use manager::{default_factory, MultisigManager, OwnerIndex};
pub use owners::OwnerSet;
pub use settlement::plan_withdrawal;
pub use transaction::{transaction_hash, Action, ProposedAction, TxDigest, TX_DOMAIN};
pub use verifier::{sort_signatures, verify_signatures, Verification};
pub use wallet::{BatchItem, ExecutionContext, MultisigWallet};
