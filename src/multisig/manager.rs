//! Wallet factory and owner registry
//!
//! Creates and initializes wallet instances, keeps them by identity, and
//! maintains an owner index that instances update on every owner change.

use crate::config::EngineConfig;
use crate::crypto::{hash160, SignatureRecovery};
use crate::host::{Environment, OwnerRegistry, Payout, RevenueHandle};
use crate::multisig::wallet::{BatchItem, ExecutionContext, MultisigWallet};
use crate::multisig::{Action, Identity, MultisigError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Owner membership as last reported by each instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerIndex {
    wallets_by_owner: HashMap<Identity, BTreeSet<Identity>>,
    quorum_by_wallet: HashMap<Identity, IndexedQuorum>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IndexedQuorum {
    owners: Vec<Identity>,
    threshold: usize,
}

impl OwnerIndex {
    /// Wallets `owner` currently belongs to, ordered by identity
    pub fn wallets_for(&self, owner: &Identity) -> Vec<Identity> {
        self.wallets_by_owner
            .get(owner)
            .map(|wallets| wallets.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Threshold last reported by `wallet`
    pub fn threshold_of(&self, wallet: &Identity) -> Option<usize> {
        self.quorum_by_wallet.get(wallet).map(|quorum| quorum.threshold)
    }
}

impl OwnerRegistry for OwnerIndex {
    fn notify_owners_changed(
        &mut self,
        instance: &Identity,
        owners: &[Identity],
        threshold: usize,
    ) {
        if let Some(previous) = self.quorum_by_wallet.remove(instance) {
            for owner in &previous.owners {
                if let Some(wallets) = self.wallets_by_owner.get_mut(owner) {
                    wallets.remove(instance);
                    if wallets.is_empty() {
                        self.wallets_by_owner.remove(owner);
                    }
                }
            }
        }

        for owner in owners {
            self.wallets_by_owner
                .entry(*owner)
                .or_default()
                .insert(*instance);
        }
        self.quorum_by_wallet.insert(
            *instance,
            IndexedQuorum {
                owners: owners.to_vec(),
                threshold,
            },
        );
        log::debug!("Indexed {} owners for {}", owners.len(), instance);
    }
}

/// Factory for multisig wallets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultisigManager {
    /// Identity the factory initializes wallets as
    factory: Identity,
    /// Fixed fee share given to new wallets
    fee_percentage: u8,
    /// Deployment counter for address generation
    nonce: u64,
    /// Multisig wallets by address
    wallets: HashMap<Identity, MultisigWallet>,
    index: OwnerIndex,
}

impl MultisigManager {
    /// Create a new empty manager
    pub fn new(factory: Identity, fee_percentage: u8) -> Self {
        Self {
            factory,
            fee_percentage,
            nonce: 0,
            wallets: HashMap::new(),
            index: OwnerIndex::default(),
        }
    }

    /// Manager using the well-known factory identity
    pub fn with_config(config: &EngineConfig) -> Self {
        Self::new(default_factory(), config.fee_percentage)
    }

    pub fn factory(&self) -> &Identity {
        &self.factory
    }

    /// Create and initialize a new wallet
    ///
    /// Without an explicit handle, revenue is metered against the wallet's
    /// own identity.
    pub fn create_wallet(
        &mut self,
        name: &str,
        owners: Vec<Identity>,
        threshold: usize,
        revenue_handle: Option<RevenueHandle>,
    ) -> Result<Identity, MultisigError> {
        let address = self.generate_address(&owners);
        let handle = revenue_handle.unwrap_or_else(|| RevenueHandle::for_instance(address));

        let mut wallet =
            MultisigWallet::new(address, name, self.factory, self.fee_percentage, handle);
        wallet.initialize(&self.factory, owners, threshold)?;
        self.nonce += 1;

        self.index
            .notify_owners_changed(&address, wallet.owners(), wallet.threshold());
        self.wallets.insert(address, wallet);

        log::info!("Created wallet {} ({})", address, name);
        Ok(address)
    }

    /// Address = HASH160(factory || nonce || owners)
    fn generate_address(&self, owners: &[Identity]) -> Identity {
        let mut data = Vec::with_capacity(20 + 8 + owners.len() * 20);
        data.extend_from_slice(self.factory.as_bytes());
        data.extend_from_slice(&self.nonce.to_be_bytes());
        for owner in owners {
            data.extend_from_slice(owner.as_bytes());
        }
        Identity::new(hash160(&data))
    }

    /// Get a wallet by address
    pub fn get_wallet(&self, address: &Identity) -> Option<&MultisigWallet> {
        self.wallets.get(address)
    }

    fn wallet_mut(&mut self, address: &Identity) -> Result<&mut MultisigWallet, MultisigError> {
        self.wallets
            .get_mut(address)
            .ok_or(MultisigError::WalletNotFound(*address))
    }

    /// List all multisig wallets, ordered by address
    pub fn list_wallets(&self) -> Vec<&MultisigWallet> {
        let mut wallets: Vec<&MultisigWallet> = self.wallets.values().collect();
        wallets.sort_by_key(|wallet| wallet.address);
        wallets
    }

    /// Get wallet count
    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    /// Check if an address is a multisig address
    pub fn is_multisig_address(&self, address: &Identity) -> bool {
        self.wallets.contains_key(address)
    }

    /// Wallets `owner` currently belongs to
    pub fn wallets_for_owner(&self, owner: &Identity) -> Vec<Identity> {
        self.index.wallets_for(owner)
    }

    pub fn owner_index(&self) -> &OwnerIndex {
        &self.index
    }

    /// Execute an authorized action on a wallet
    pub fn execute(
        &mut self,
        env: &mut dyn Environment,
        recovery: &dyn SignatureRecovery,
        caller: Identity,
        address: &Identity,
        action: Action,
        signatures: &[Vec<u8>],
    ) -> Result<Vec<u8>, MultisigError> {
        let wallet = self
            .wallets
            .get_mut(address)
            .ok_or(MultisigError::WalletNotFound(*address))?;
        let mut ctx = ExecutionContext {
            env,
            registry: &mut self.index,
            recovery,
            caller,
        };
        wallet.execute(&mut ctx, action, signatures)
    }

    /// Execute a batch of authorized actions on a wallet
    pub fn execute_batch(
        &mut self,
        env: &mut dyn Environment,
        recovery: &dyn SignatureRecovery,
        caller: Identity,
        address: &Identity,
        items: Vec<BatchItem>,
    ) -> Result<Vec<Vec<u8>>, MultisigError> {
        let wallet = self
            .wallets
            .get_mut(address)
            .ok_or(MultisigError::WalletNotFound(*address))?;
        let mut ctx = ExecutionContext {
            env,
            registry: &mut self.index,
            recovery,
            caller,
        };
        wallet.execute_batch(&mut ctx, items)
    }

    pub fn deposit(
        &mut self,
        env: &mut dyn Environment,
        address: &Identity,
        sender: &Identity,
        amount: u64,
    ) -> Result<u64, MultisigError> {
        self.wallet_mut(address)?.deposit(env, sender, amount)
    }

    pub fn withdraw(
        &mut self,
        env: &mut dyn Environment,
        address: &Identity,
    ) -> Result<Vec<Payout>, MultisigError> {
        self.wallet_mut(address)?.withdraw(env)
    }
}

/// Well-known factory identity used by the CLI
pub fn default_factory() -> Identity {
    Identity::new(hash160(b"quorum-wallet/factory"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Secp256k1Recovery};
    use crate::host::{Host, LocalChain};
    use crate::multisig::ProposedAction;

    fn create_test_keys() -> Vec<KeyPair> {
        let mut keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        keys.sort_by_key(|k| k.identity());
        keys
    }

    fn manager() -> MultisigManager {
        MultisigManager::with_config(&EngineConfig::default())
    }

    #[test]
    fn test_manager_creation() {
        let manager = manager();
        assert_eq!(manager.wallet_count(), 0);
        assert_eq!(*manager.factory(), default_factory());
    }

    #[test]
    fn test_wallet_creation() {
        let mut manager = manager();
        let keys = create_test_keys();
        let owners: Vec<Identity> = keys.iter().map(|k| k.identity()).collect();

        let first = manager.create_wallet("a", owners.clone(), 2, None).unwrap();
        let second = manager.create_wallet("b", owners.clone(), 2, None).unwrap();

        // Same owners still get distinct instances
        assert_ne!(first, second);
        assert_eq!(manager.wallet_count(), 2);
        assert!(manager.is_multisig_address(&first));

        let wallet = manager.get_wallet(&first).unwrap();
        assert_eq!(wallet.description(), "2-of-3");
        assert_eq!(wallet.fee_percentage(), 20);
        assert_eq!(*wallet.revenue_handle(), RevenueHandle::for_instance(first));

        assert_eq!(manager.wallets_for_owner(&owners[0]).len(), 2);
        assert_eq!(manager.list_wallets().len(), 2);
    }

    #[test]
    fn test_invalid_wallet_is_not_stored() {
        let mut manager = manager();
        let owners = vec![Identity::new([1; 20])];

        assert!(manager.create_wallet("bad", owners.clone(), 2, None).is_err());
        assert_eq!(manager.wallet_count(), 0);
        assert!(manager.wallets_for_owner(&owners[0]).is_empty());
    }

    #[test]
    fn test_custom_revenue_handle() {
        let mut manager = manager();
        let handle = RevenueHandle(Identity::new([0x42; 20]));
        let address = manager
            .create_wallet("meter", vec![Identity::new([1; 20])], 1, Some(handle))
            .unwrap();
        assert_eq!(*manager.get_wallet(&address).unwrap().revenue_handle(), handle);
    }

    #[test]
    fn test_owner_index_follows_owner_changes() {
        let mut manager = manager();
        let mut chain = LocalChain::default();
        let keys = create_test_keys();
        let owners: Vec<Identity> = keys.iter().map(|k| k.identity()).collect();
        let address = manager.create_wallet("w", owners.clone(), 1, None).unwrap();

        let action = Action::RemoveOwner {
            owner: owners[0],
            threshold: 1,
        };
        let digest = manager
            .get_wallet(&address)
            .unwrap()
            .transaction_hash(chain.chain_id(), &action);
        let signatures = vec![keys[1].sign(digest.as_bytes())];

        let caller = owners[1];
        manager
            .execute(&mut chain, &Secp256k1Recovery, caller, &address, action, &signatures)
            .unwrap();

        assert!(manager.wallets_for_owner(&owners[0]).is_empty());
        assert_eq!(manager.wallets_for_owner(&owners[1]), vec![address]);
        assert_eq!(manager.owner_index().threshold_of(&address), Some(1));
    }

    #[test]
    fn test_execute_and_withdraw_through_manager() {
        let mut manager = manager();
        let mut chain = LocalChain::default();
        let keys = create_test_keys();
        let owners: Vec<Identity> = keys.iter().map(|k| k.identity()).collect();
        let address = manager.create_wallet("w", owners.clone(), 2, None).unwrap();

        let funder = Identity::new([0x10; 20]);
        chain.mint(&funder, 500).unwrap();
        manager.deposit(&mut chain, &address, &funder, 500).unwrap();

        let recipient = Identity::new([0x20; 20]);
        let action = Action::Call(ProposedAction::transfer(recipient, 200));
        let digest = manager
            .get_wallet(&address)
            .unwrap()
            .transaction_hash(chain.chain_id(), &action);
        let signatures: Vec<Vec<u8>> = keys[..2]
            .iter()
            .map(|k| k.sign(digest.as_bytes()))
            .collect();

        let outcome =
            manager.execute(&mut chain, &Secp256k1Recovery, funder, &address, action, &signatures);
        assert!(outcome.is_ok());
        assert_eq!(chain.balance_of(&recipient), 200);

        let payouts = manager.withdraw(&mut chain, &address).unwrap();
        assert_eq!(payouts.iter().map(|p| p.amount).sum::<u64>(), 300);
        assert_eq!(chain.balance_of(&address), 0);
    }

    #[test]
    fn test_unknown_wallet() {
        let mut manager = manager();
        let mut chain = LocalChain::default();
        let missing = Identity::new([3; 20]);
        assert!(matches!(
            manager.withdraw(&mut chain, &missing),
            Err(MultisigError::WalletNotFound(_))
        ));
    }
}
