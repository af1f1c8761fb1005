//! Collaborators the wallet engine talks to
//!
//! The engine never moves funds itself. Balances, call dispatch and the
//! revenue meter live on a host, reached through the traits below.
//! [`LocalChain`] is an in-memory host used by the CLI and the tests.

pub mod local;

pub use local::LocalChain;

use crate::multisig::{Identity, ProposedAction};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors reported by a host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Insufficient balance for {account}: have {have}, need {need}")]
    InsufficientBalance {
        account: Identity,
        have: u64,
        need: u64,
    },
    #[error("Call rejected by {0}")]
    CallRejected(Identity),
    #[error("Transfer rejected by {0}")]
    TransferRejected(Identity),
    #[error("Balance overflow for {0}")]
    Overflow(Identity),
    #[error("Revenue withdrawal of {requested} exceeds accrued {accrued}")]
    RevenueUnavailable { requested: u64, accrued: u64 },
}

/// Handle through which an instance's accrued revenue is metered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RevenueHandle(pub Identity);

impl RevenueHandle {
    /// The default handle, keyed by the instance identity
    pub fn for_instance(instance: Identity) -> Self {
        Self(instance)
    }
}

impl fmt::Display for RevenueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "revenue:{}", self.0)
    }
}

/// A single transfer in a settlement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: Identity,
    pub amount: u64,
}

/// Native balances and call dispatch
pub trait Host {
    /// Identifier of the execution environment, bound into every digest
    fn chain_id(&self) -> u64;

    fn balance_of(&self, account: &Identity) -> u64;

    /// Move funds between two accounts
    fn transfer(&mut self, from: &Identity, to: &Identity, amount: u64) -> Result<(), HostError>;

    /// Apply all payouts from `from` or none of them
    fn settle(&mut self, from: &Identity, payouts: &[Payout]) -> Result<(), HostError>;

    /// Forward a value-bearing call, returning the callee's result bytes
    fn dispatch(&mut self, from: &Identity, call: &ProposedAction) -> Result<Vec<u8>, HostError>;
}

/// External revenue meter tied to an instance's activity
pub trait RevenueSource {
    fn query_balance(&self, handle: &RevenueHandle) -> u64;

    /// Release up to `amount` of accrued revenue to `recipient`, returning what was paid
    fn withdraw(
        &mut self,
        handle: &RevenueHandle,
        recipient: &Identity,
        amount: u64,
    ) -> Result<u64, HostError>;
}

/// Receives owner-set changes so instances can be indexed by owner
pub trait OwnerRegistry {
    fn notify_owners_changed(&mut self, instance: &Identity, owners: &[Identity], threshold: usize);
}

/// Everything an invocation needs from the host side
pub trait Environment: Host + RevenueSource {}

impl<T: Host + RevenueSource> Environment for T {}
