//! Withdrawal settlement
//!
//! A sweep pays every claimable allocation, then divides whatever balance is
//! left (division remainders, direct deposits) evenly across the owners. The
//! indivisible dust of that last split goes to the first owner so nothing is
//! stranded in the wallet.

use crate::host::Payout;
use crate::multisig::{AllocationLedger, Identity, MultisigError};

/// Payouts for sweeping `balance` out of a wallet
///
/// Owners come first in owner-set order, followed by any other identity
/// holding an allocation (executors who are not owners, removed owners).
/// Each recipient appears once.
///
/// # Errors
/// - `NoFeeToWithdraw` if the balance is zero
/// - `UnderfundedAllocations` if allocations exceed the balance
pub fn plan_withdrawal(
    balance: u64,
    ledger: &AllocationLedger,
    owners: &[Identity],
) -> Result<Vec<Payout>, MultisigError> {
    if balance == 0 {
        return Err(MultisigError::NoFeeToWithdraw);
    }

    let allocated = ledger.total_allocated();
    if allocated > balance {
        return Err(MultisigError::UnderfundedAllocations { allocated, balance });
    }

    let residual = balance - allocated;
    let (per_owner, dust) = if owners.is_empty() {
        (0, 0)
    } else {
        let count = owners.len() as u64;
        (residual / count, residual % count)
    };

    let mut payouts: Vec<Payout> = owners
        .iter()
        .enumerate()
        .map(|(index, owner)| {
            let bonus = if index == 0 { dust } else { 0 };
            Payout {
                recipient: *owner,
                amount: ledger.allocation_of(owner) + per_owner + bonus,
            }
        })
        .collect();

    for (identity, amount) in ledger.entries() {
        if !owners.contains(&identity) {
            payouts.push(Payout {
                recipient: identity,
                amount,
            });
        }
    }

    payouts.retain(|payout| payout.amount > 0);
    Ok(payouts)
}
