//! Error taxonomy for multisig operations

use crate::crypto::KeyError;
use crate::host::HostError;
use crate::multisig::{Identity, MAX_FEE_PERCENTAGE};
use thiserror::Error;

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Invalid owner: {0}")]
    InvalidOwner(Identity),
    #[error("Invalid signer: {0}")]
    InvalidSigner(String),
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Not enough signers: threshold {threshold} exceeds owner count {owners}")]
    NotEnoughSigners { threshold: usize, owners: usize },
    #[error("Duplicate or unordered signature at index {index}")]
    DuplicateOrUnorderedSignatures { index: usize },
    #[error("Insufficient valid signatures: have {have}, need {need}")]
    InsufficientValidSignatures { have: usize, need: usize },
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("No fee to distribute")]
    NoFeeToDistribute,
    #[error("No fee to withdraw")]
    NoFeeToWithdraw,
    #[error("Allocations of {allocated} exceed wallet balance {balance}")]
    UnderfundedAllocations { allocated: u64, balance: u64 },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Wallet already initialized")]
    AlreadyInitialized,
    #[error("Wallet not initialized")]
    NotInitialized,
    #[error("Invalid fee percentage {0}: at most {max} allowed", max = MAX_FEE_PERCENTAGE)]
    InvalidFeePercentage(u8),
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Wallet not found: {0}")]
    WalletNotFound(Identity),
    #[error("Batch item {index} failed: {source}")]
    BatchItemFailed {
        index: usize,
        #[source]
        source: Box<MultisigError>,
    },
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

impl From<KeyError> for MultisigError {
    fn from(err: KeyError) -> Self {
        MultisigError::InvalidSigner(err.to_string())
    }
}
