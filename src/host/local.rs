//! In-memory host with native balances and a revenue meter
//!
//! Accrued revenue is escrowed on the chain itself: accruing mints into the
//! meter, and releasing moves it into a recipient's balance.

use crate::host::{Host, HostError, Payout, RevenueHandle, RevenueSource};
use crate::multisig::{Identity, ProposedAction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Default chain identifier for a fresh devnet
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// A dispatched call as observed by the chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub from: Identity,
    pub to: Identity,
    pub value: u64,
    pub payload: Vec<u8>,
}

/// In-memory host chain
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalChain {
    chain_id: u64,
    balances: HashMap<Identity, u64>,
    revenue: HashMap<RevenueHandle, u64>,
    /// Accounts that refuse incoming calls and transfers
    rejecting: BTreeSet<Identity>,
    calls: Vec<CallRecord>,
}

impl Default for LocalChain {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_ID)
    }
}

impl LocalChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            balances: HashMap::new(),
            revenue: HashMap::new(),
            rejecting: BTreeSet::new(),
            calls: Vec::new(),
        }
    }

    /// Create funds out of thin air
    pub fn mint(&mut self, to: &Identity, amount: u64) -> Result<u64, HostError> {
        let balance = self.balances.entry(*to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(HostError::Overflow(*to))?;
        Ok(*balance)
    }

    /// Record revenue accrued against a handle
    pub fn accrue(&mut self, handle: &RevenueHandle, amount: u64) -> Result<u64, HostError> {
        let accrued = self.revenue.entry(*handle).or_insert(0);
        *accrued = accrued
            .checked_add(amount)
            .ok_or(HostError::Overflow(handle.0))?;
        log::debug!("Accrued {} on {} (total {})", amount, handle, accrued);
        Ok(*accrued)
    }

    /// Make an account refuse calls and transfers
    pub fn reject_calls_to(&mut self, account: Identity) {
        self.rejecting.insert(account);
    }

    pub fn accept_calls_to(&mut self, account: &Identity) {
        self.rejecting.remove(account);
    }

    /// Calls dispatched so far, oldest first
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    fn debit(&mut self, from: &Identity, amount: u64) -> Result<(), HostError> {
        let have = self.balance_of(from);
        if have < amount {
            return Err(HostError::InsufficientBalance {
                account: *from,
                have,
                need: amount,
            });
        }
        self.balances.insert(*from, have - amount);
        Ok(())
    }

    fn credit(&mut self, to: &Identity, amount: u64) -> Result<(), HostError> {
        self.mint(to, amount).map(|_| ())
    }
}

impl Host for LocalChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn balance_of(&self, account: &Identity) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Identity, to: &Identity, amount: u64) -> Result<(), HostError> {
        if self.rejecting.contains(to) {
            return Err(HostError::TransferRejected(*to));
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn settle(&mut self, from: &Identity, payouts: &[Payout]) -> Result<(), HostError> {
        // Validate the whole batch before touching balances
        let mut total: u64 = 0;
        for payout in payouts {
            if self.rejecting.contains(&payout.recipient) {
                return Err(HostError::TransferRejected(payout.recipient));
            }
            total = total
                .checked_add(payout.amount)
                .ok_or(HostError::Overflow(*from))?;
        }

        let have = self.balance_of(from);
        if have < total {
            return Err(HostError::InsufficientBalance {
                account: *from,
                have,
                need: total,
            });
        }

        for payout in payouts {
            self.transfer(from, &payout.recipient, payout.amount)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, from: &Identity, call: &ProposedAction) -> Result<Vec<u8>, HostError> {
        if self.rejecting.contains(&call.destination) {
            return Err(HostError::CallRejected(call.destination));
        }
        self.debit(from, call.value)?;
        self.credit(&call.destination, call.value)?;

        self.calls.push(CallRecord {
            from: *from,
            to: call.destination,
            value: call.value,
            payload: call.payload.clone(),
        });

        // Local accounts have no code; echo the payload as the call result
        Ok(call.payload.clone())
    }
}

impl RevenueSource for LocalChain {
    fn query_balance(&self, handle: &RevenueHandle) -> u64 {
        self.revenue.get(handle).copied().unwrap_or(0)
    }

    fn withdraw(
        &mut self,
        handle: &RevenueHandle,
        recipient: &Identity,
        amount: u64,
    ) -> Result<u64, HostError> {
        let accrued = self.query_balance(handle);
        if amount > accrued {
            return Err(HostError::RevenueUnavailable {
                requested: amount,
                accrued,
            });
        }
        self.credit(recipient, amount)?;
        self.revenue.insert(*handle, accrued - amount);
        Ok(amount)
    }
}
