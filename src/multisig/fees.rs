//! Fee distribution and the allocation ledger
//!
//! Revenue pulled for an execution is split three ways: a fixed share to the
//! first approver, the same share to the executor, and the rest evenly across
//! the other approvers. Shares are credited, never paid on the spot.

use crate::multisig::Identity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default fixed share, in percent, for the first approver and the executor
pub const DEFAULT_FEE_PERCENTAGE: u8 = 20;

/// Highest fixed share that still leaves both fixed shares within the revenue
pub const MAX_FEE_PERCENTAGE: u8 = 50;

/// Claimable balances plus the undivided remainder of even splits
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AllocationLedger {
    allocations: HashMap<Identity, u64>,
    remainder: u64,
}

impl AllocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&mut self, identity: Identity, amount: u64) {
        if amount == 0 {
            return;
        }
        let entry = self.allocations.entry(identity).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn allocation_of(&self, identity: &Identity) -> u64 {
        self.allocations.get(identity).copied().unwrap_or(0)
    }

    /// Sum of every claimable balance, saturating at `u64::MAX`
    pub fn total_allocated(&self) -> u64 {
        self.allocations
            .values()
            .fold(0u64, |total, amount| total.saturating_add(*amount))
    }

    /// Revenue left over by integer division, reconciled at withdrawal
    pub fn remainder(&self) -> u64 {
        self.remainder
    }

    /// Non-zero allocations, ordered by identity
    pub fn entries(&self) -> Vec<(Identity, u64)> {
        let mut entries: Vec<(Identity, u64)> = self
            .allocations
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(identity, amount)| (*identity, *amount))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Apply a split to the ledger
    pub fn apply(&mut self, split: &FeeSplit) {
        self.credit(split.first_approver, split.first_share);
        self.credit(split.executor, split.executor_share);
        for approver in &split.other_approvers {
            self.credit(*approver, split.per_approver);
        }
        self.remainder = self.remainder.saturating_add(split.remainder);
    }

    /// Zero every entry and the remainder after a settlement
    pub fn clear(&mut self) {
        self.allocations.clear();
        self.remainder = 0;
    }
}

/// How one revenue pull was divided
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub revenue: u64,
    pub first_approver: Identity,
    pub first_share: u64,
    pub executor: Identity,
    pub executor_share: u64,
    /// Approvers after the first, each credited `per_approver`
    pub other_approvers: Vec<Identity>,
    pub per_approver: u64,
    pub remainder: u64,
}

impl FeeSplit {
    /// Total credited to identities (excludes the remainder)
    pub fn credited(&self) -> u64 {
        self.first_share
            + self.executor_share
            + self.per_approver * self.other_approvers.len() as u64
    }
}

/// Split `revenue` between approvers and the executor
///
/// Returns `None` when there is nothing to split, nobody approved, or the
/// percentage exceeds [`MAX_FEE_PERCENTAGE`].
/// With a single approver there is no one to share the even part with, so it
/// folds into the first approver's share.
pub fn split_fee(
    revenue: u64,
    fee_percentage: u8,
    approvers: &[Identity],
    executor: Identity,
) -> Option<FeeSplit> {
    let (first_approver, others) = approvers.split_first()?;
    if revenue == 0 || fee_percentage > MAX_FEE_PERCENTAGE {
        return None;
    }

    let percentage = u128::from(fee_percentage);
    let fixed_share = (u128::from(revenue) * percentage / 100) as u64;
    let rest = revenue - 2 * fixed_share;

    let (first_share, per_approver, remainder) = if others.is_empty() {
        (fixed_share + rest, 0, 0)
    } else {
        let count = others.len() as u64;
        (fixed_share, rest / count, rest % count)
    };

    Some(FeeSplit {
        revenue,
        first_approver: *first_approver,
        first_share,
        executor,
        executor_share: fixed_share,
        other_approvers: others.to_vec(),
        per_approver,
        remainder,
    })
}
