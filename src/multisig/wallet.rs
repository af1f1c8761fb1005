//! Multi-signature wallet instance and its execution engine
//!
//! Every authorized action goes through the same pipeline:
//! hash, verify, distribute fees, dispatch, emit.
//!
//! The nonce advances as soon as the digest is derived and is never rolled
//! back, so a digest is consumed even when verification or dispatch fails.

use crate::crypto::SignatureRecovery;
use crate::host::{Environment, OwnerRegistry, Payout, RevenueHandle};
use crate::multisig::events::{EventLog, ExecutionRecord, LoggedEvent, WalletEvent};
use crate::multisig::fees::{split_fee, AllocationLedger, FeeSplit, MAX_FEE_PERCENTAGE};
use crate::multisig::settlement::plan_withdrawal;
use crate::multisig::transaction::{transaction_hash, Action, TxDigest};
use crate::multisig::verifier::verify_signatures;
use crate::multisig::{Identity, MultisigError, OwnerSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collaborators for one invocation
pub struct ExecutionContext<'a> {
    pub env: &'a mut dyn Environment,
    pub registry: &'a mut dyn OwnerRegistry,
    pub recovery: &'a dyn SignatureRecovery,
    /// Whoever submits the invocation; credited as executor
    pub caller: Identity,
}

/// One entry of a batch execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchItem {
    pub action: Action,
    pub signatures: Vec<Vec<u8>>,
}

/// A threshold wallet instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigWallet {
    /// Identity of this instance, bound into every digest
    pub address: Identity,
    /// Human-readable name
    pub name: String,
    /// Only this identity may initialize the wallet
    factory: Identity,
    initialized: bool,
    owners: OwnerSet,
    nonce: u64,
    fee_percentage: u8,
    revenue_handle: RevenueHandle,
    ledger: AllocationLedger,
    events: EventLog,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl MultisigWallet {
    /// Create an uninitialized wallet owned by `factory`
    pub fn new(
        address: Identity,
        name: impl Into<String>,
        factory: Identity,
        fee_percentage: u8,
        revenue_handle: RevenueHandle,
    ) -> Self {
        Self {
            address,
            name: name.into(),
            factory,
            initialized: false,
            owners: OwnerSet::default(),
            nonce: 0,
            fee_percentage,
            revenue_handle,
            ledger: AllocationLedger::new(),
            events: EventLog::default(),
            created_at: Utc::now(),
        }
    }

    /// Set the initial owners and threshold; callable once, by the factory
    pub fn initialize(
        &mut self,
        caller: &Identity,
        owners: Vec<Identity>,
        threshold: usize,
    ) -> Result<(), MultisigError> {
        if *caller != self.factory {
            return Err(MultisigError::Unauthorized(format!(
                "{} is not the factory of {}",
                caller, self.address
            )));
        }
        if self.initialized {
            return Err(MultisigError::AlreadyInitialized);
        }
        if self.fee_percentage > MAX_FEE_PERCENTAGE {
            return Err(MultisigError::InvalidFeePercentage(self.fee_percentage));
        }

        self.owners = OwnerSet::new(owners, threshold)?;
        self.initialized = true;

        log::info!(
            "Initialized wallet {} ({}) as {}",
            self.address,
            self.name,
            self.owners.description()
        );
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn owners(&self) -> &[Identity] {
        self.owners.owners()
    }

    pub fn threshold(&self) -> usize {
        self.owners.threshold()
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn is_owner(&self, identity: &Identity) -> bool {
        self.owners.contains(identity)
    }

    /// Get human-readable description like "2-of-3"
    pub fn description(&self) -> String {
        self.owners.description()
    }

    /// The replay counter; the next execution consumes this value
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn fee_percentage(&self) -> u8 {
        self.fee_percentage
    }

    pub fn revenue_handle(&self) -> &RevenueHandle {
        &self.revenue_handle
    }

    pub fn allocation_of(&self, identity: &Identity) -> u64 {
        self.ledger.allocation_of(identity)
    }

    pub fn ledger(&self) -> &AllocationLedger {
        &self.ledger
    }

    pub fn events(&self) -> &[LoggedEvent] {
        self.events.entries()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    /// Digest owners must sign for `action` at the current nonce
    pub fn transaction_hash(&self, chain_id: u64, action: &Action) -> TxDigest {
        self.transaction_hash_at(chain_id, self.nonce, action)
    }

    pub fn transaction_hash_at(&self, chain_id: u64, nonce: u64, action: &Action) -> TxDigest {
        transaction_hash(chain_id, &self.address, nonce, &action.to_call(&self.address))
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Authorize and perform one action, returning the call result bytes
    pub fn execute(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        action: Action,
        signatures: &[Vec<u8>],
    ) -> Result<Vec<u8>, MultisigError> {
        if !self.initialized {
            return Err(MultisigError::NotInitialized);
        }
        if let Action::Call(call) = &action {
            // Self-calls would collide with administrative digests
            if call.destination == self.address {
                return Err(MultisigError::Unauthorized(
                    "calls to the wallet itself must be administrative actions".to_string(),
                ));
            }
        }

        // Hash, then consume the nonce before anything can fail
        let nonce = self.nonce;
        let digest = self.transaction_hash_at(ctx.env.chain_id(), nonce, &action);
        self.nonce += 1;
        log::debug!("Wallet {} consumed nonce {} for {}", self.address, nonce, digest);

        let verification = verify_signatures(&digest, signatures, &self.owners, ctx.recovery)
            .map_err(|err| {
                log::warn!("Rejected execution {} on {}: {}", nonce, self.address, err);
                err
            })?;

        self.distribute_fees(ctx, &verification.approvers);

        let call = action.to_call(&self.address);
        let result = match &action {
            Action::Call(outbound) => ctx.env.dispatch(&self.address, outbound).map_err(|err| {
                log::warn!("Dispatch {} from {} failed: {}", nonce, self.address, err);
                MultisigError::ExecutionFailed(err.to_string())
            })?,
            admin => {
                self.apply_admin(ctx.registry, admin)?;
                Vec::new()
            }
        };

        log::info!(
            "Executed nonce {} on {} -> {} (value {})",
            nonce,
            self.address,
            call.destination,
            call.value
        );
        self.events.emit(WalletEvent::Execution(ExecutionRecord {
            initiator: ctx.caller,
            destination: call.destination,
            value: call.value,
            payload: call.payload,
            nonce,
            digest,
            result: result.clone(),
        }));

        Ok(result)
    }

    /// Execute actions in order, stopping at the first failure
    ///
    /// Items before the failing one stay committed.
    pub fn execute_batch(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        items: Vec<BatchItem>,
    ) -> Result<Vec<Vec<u8>>, MultisigError> {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let result = self
                .execute(ctx, item.action, &item.signatures)
                .map_err(|err| MultisigError::BatchItemFailed {
                    index,
                    source: Box::new(err),
                })?;
            results.push(result);
        }
        Ok(results)
    }

    /// Pull accrued revenue and credit the split; failures are logged, not raised
    fn distribute_fees(&mut self, ctx: &mut ExecutionContext<'_>, approvers: &[Identity]) {
        let accrued = ctx.env.query_balance(&self.revenue_handle);
        if accrued == 0 {
            return;
        }
        if approvers.is_empty() {
            log::warn!("{} on {}", MultisigError::NoFeeToDistribute, self.address);
            return;
        }

        let pulled = match ctx.env.withdraw(&self.revenue_handle, &self.address, accrued) {
            Ok(pulled) => pulled,
            Err(err) => {
                log::warn!("Revenue pull for {} failed: {}", self.address, err);
                return;
            }
        };

        let Some(split) = split_fee(pulled, self.fee_percentage, approvers, ctx.caller) else {
            return;
        };
        self.ledger.apply(&split);
        log::info!(
            "Distributed {} on {}: first approver {}, executor {}, {} each to {} others",
            split.revenue,
            self.address,
            split.first_share,
            split.executor_share,
            split.per_approver,
            split.other_approvers.len()
        );
        self.events.emit(WalletEvent::FeeDistributed(split));
    }

    fn apply_admin(
        &mut self,
        registry: &mut dyn OwnerRegistry,
        action: &Action,
    ) -> Result<(), MultisigError> {
        let previous_threshold = self.owners.threshold();
        match action {
            Action::Call(_) => return Ok(()),
            Action::AddOwner { owner, threshold } => {
                self.owners.add_owner(*owner, *threshold)?;
                log::info!("Added owner {} to {}", owner, self.address);
                self.events.emit(WalletEvent::OwnerChanged {
                    identity: *owner,
                    added: true,
                });
            }
            Action::RemoveOwner { owner, threshold } => {
                self.owners.remove_owner(owner, *threshold)?;
                log::info!("Removed owner {} from {}", owner, self.address);
                self.events.emit(WalletEvent::OwnerChanged {
                    identity: *owner,
                    added: false,
                });
            }
            Action::ChangeThreshold { threshold } => {
                self.owners.change_threshold(*threshold)?;
            }
        }

        if self.owners.threshold() != previous_threshold {
            self.events.emit(WalletEvent::ThresholdChanged {
                threshold: self.owners.threshold(),
            });
        }

        registry.notify_owners_changed(
            &self.address,
            self.owners.owners(),
            self.owners.threshold(),
        );
        Ok(())
    }

    // =========================================================================
    // Funds
    // =========================================================================

    /// Move `amount` from `sender` into the wallet
    pub fn deposit(
        &mut self,
        env: &mut dyn Environment,
        sender: &Identity,
        amount: u64,
    ) -> Result<u64, MultisigError> {
        if !self.initialized {
            return Err(MultisigError::NotInitialized);
        }
        if amount == 0 {
            return Err(MultisigError::InvalidAmount);
        }
        env.transfer(sender, &self.address, amount)?;

        let new_balance = env.balance_of(&self.address);
        self.events.emit(WalletEvent::Deposit {
            sender: *sender,
            amount,
            new_balance,
        });
        Ok(new_balance)
    }

    /// Sweep the wallet: pay every allocation, then split the rest across owners
    ///
    /// Anyone may call this. Either every payout lands or none does.
    pub fn withdraw(&mut self, env: &mut dyn Environment) -> Result<Vec<Payout>, MultisigError> {
        if !self.initialized {
            return Err(MultisigError::NotInitialized);
        }
        let balance = env.balance_of(&self.address);
        let payouts = plan_withdrawal(balance, &self.ledger, self.owners.owners())?;

        // Clear claims before funds leave; restore them if the host refuses
        let snapshot = self.ledger.clone();
        self.ledger.clear();
        if let Err(err) = env.settle(&self.address, &payouts) {
            self.ledger = snapshot;
            log::warn!("Withdrawal from {} failed: {}", self.address, err);
            return Err(err.into());
        }

        for payout in &payouts {
            self.events.emit(WalletEvent::Payout {
                recipient: payout.recipient,
                amount: payout.amount,
            });
        }
        log::info!(
            "Withdrew {} from {} to {} recipients",
            balance,
            self.address,
            payouts.len()
        );
        Ok(payouts)
    }

    /// The most recent fee split, if any
    pub fn last_fee_split(&self) -> Option<&FeeSplit> {
        self.events.entries().iter().rev().find_map(|entry| match &entry.event {
            WalletEvent::FeeDistributed(split) => Some(split),
            _ => None,
        })
    }
}
