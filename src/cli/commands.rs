//! CLI commands for the local devnet
//!
//! Implements all command handlers for the CLI interface.

use crate::config::EngineConfig;
use crate::crypto::{KeyPair, Secp256k1Recovery};
use crate::host::{Host, LocalChain, RevenueSource};
use crate::multisig::{sort_signatures, Action, Identity, MultisigManager, TxDigest, WalletEvent};
use crate::storage::{Storage, StorageConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Everything persisted between invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevnetState {
    pub chain: LocalChain,
    pub manager: MultisigManager,
}

impl DevnetState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            chain: LocalChain::new(config.chain_id),
            manager: MultisigManager::with_config(config),
        }
    }
}

/// Application state
pub struct AppState {
    pub devnet: DevnetState,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the devnet, creating a fresh one on first use
    pub fn new(data_dir: PathBuf, config: &EngineConfig) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;

        let devnet = if storage.exists() {
            log::debug!("Loading devnet from {:?}", data_dir);
            storage.load()?
        } else {
            println!("🆕 Creating new devnet...");
            let devnet = DevnetState::new(config);
            storage.save(&devnet)?;
            devnet
        };

        Ok(Self {
            devnet,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.devnet)?;
        Ok(())
    }
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

/// Initialize a new devnet
pub fn cmd_init(data_dir: &Path, config: &EngineConfig, force: bool) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.exists() && !force {
        println!("⚠️  Devnet already exists at {:?}", data_dir);
        println!("   Use --force to reinitialize (this will delete existing data)");
        return Ok(());
    }

    if force {
        storage.delete()?;
    }
    let devnet = DevnetState::new(config);
    storage.save(&devnet)?;

    println!("✅ Devnet initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🔗 Chain id: {}", config.chain_id);
    println!("   💸 Fee percentage: {}%", config.fee_percentage);
    println!("   🏭 Factory: {}", devnet.manager.factory());

    Ok(())
}

/// Generate signing keys
pub fn cmd_keygen(count: usize) -> CliResult<()> {
    let mut keys: Vec<KeyPair> = (0..count).map(|_| KeyPair::generate()).collect();
    keys.sort_by_key(|key| key.identity());

    println!("🔐 Generated {} key(s), ordered by identity:", keys.len());
    for key in &keys {
        println!("\n   📍 Identity:    {}", key.identity());
        println!("   🔑 Public Key:  {}", key.public_key_hex());
        println!("   🗝️  Private Key: {}", key.private_key_hex());
    }
    println!("\n   ⚠️  Private keys are not stored. Keep them somewhere safe!");

    Ok(())
}

/// Mint devnet funds to an account
pub fn cmd_fund(state: &mut AppState, to: &Identity, amount: u64) -> CliResult<()> {
    let balance = state.devnet.chain.mint(to, amount)?;
    state.save()?;

    println!("💰 Funded {} with {}", to, amount);
    println!("   New balance: {}", balance);
    Ok(())
}

/// Accrue revenue against a wallet's revenue handle
pub fn cmd_accrue(state: &mut AppState, wallet: &Identity, amount: u64) -> CliResult<()> {
    let handle = *state
        .devnet
        .manager
        .get_wallet(wallet)
        .ok_or_else(|| format!("Wallet {} not found", wallet))?
        .revenue_handle();

    let accrued = state.devnet.chain.accrue(&handle, amount)?;
    state.save()?;

    println!("📈 Accrued {} for {}", amount, wallet);
    println!("   Pending revenue: {}", accrued);
    Ok(())
}

/// Create a new multisig wallet
pub fn cmd_create(
    state: &mut AppState,
    name: &str,
    owners: Vec<Identity>,
    threshold: usize,
) -> CliResult<()> {
    let address = state
        .devnet
        .manager
        .create_wallet(name, owners, threshold, None)?;
    state.save()?;

    let wallet = state
        .devnet
        .manager
        .get_wallet(&address)
        .ok_or("wallet missing after creation")?;

    println!("🔐 Multisig wallet created!");
    println!("   📍 Address: {}", address);
    println!("   🏷️  Name: {}", name);
    println!("   ✍️  Policy: {}", wallet.description());
    for owner in wallet.owners() {
        println!("   └─ {}", owner);
    }
    Ok(())
}

/// Print the digest owners must sign
pub fn cmd_hash(
    state: &AppState,
    wallet: &Identity,
    action: &Action,
    nonce: Option<u64>,
) -> CliResult<()> {
    let instance = state
        .devnet
        .manager
        .get_wallet(wallet)
        .ok_or_else(|| format!("Wallet {} not found", wallet))?;
    let chain_id = state.devnet.chain.chain_id();
    let nonce = nonce.unwrap_or_else(|| instance.nonce());

    let digest = instance.transaction_hash_at(chain_id, nonce, action);
    println!("🧾 Digest for nonce {}: {}", nonce, digest);
    Ok(())
}

/// Sign a digest with a private key
pub fn cmd_sign(digest: &str, private_key: &str) -> CliResult<()> {
    let digest = TxDigest::from_hex(digest).ok_or("digest must be 32 bytes of hex")?;
    let key = KeyPair::from_private_key_hex(private_key)?;

    println!("✍️  Signer:    {}", key.identity());
    println!("   Signature: {}", hex::encode(key.sign(digest.as_bytes())));
    Ok(())
}

/// Execute an action on a wallet
///
/// State is saved even when execution fails, since the nonce is spent.
pub fn cmd_exec(
    state: &mut AppState,
    wallet: &Identity,
    caller: Identity,
    action: Action,
    signatures: &[String],
    sort: bool,
) -> CliResult<()> {
    let mut decoded = signatures
        .iter()
        .map(|signature| hex::decode(signature.trim().trim_start_matches("0x")))
        .collect::<Result<Vec<_>, _>>()?;

    if sort {
        let instance = state
            .devnet
            .manager
            .get_wallet(wallet)
            .ok_or_else(|| format!("Wallet {} not found", wallet))?;
        let digest = instance.transaction_hash(state.devnet.chain.chain_id(), &action);
        decoded = sort_signatures(&digest, decoded, &Secp256k1Recovery)?;
    }

    let is_admin = action.is_admin();
    let DevnetState { chain, manager } = &mut state.devnet;
    let outcome = manager.execute(chain, &Secp256k1Recovery, caller, wallet, action, &decoded);
    state.save()?;

    let result = outcome?;
    if is_admin {
        println!("✅ Administrative action applied to {}", wallet);
    } else {
        println!("✅ Executed on {}", wallet);
    }
    if !result.is_empty() {
        println!("   Result: {}", hex::encode(&result));
    }
    if let Some(instance) = state.devnet.manager.get_wallet(wallet) {
        println!("   Next nonce: {}", instance.nonce());
    }
    Ok(())
}

/// Deposit funds into a wallet
pub fn cmd_deposit(
    state: &mut AppState,
    wallet: &Identity,
    from: &Identity,
    amount: u64,
) -> CliResult<()> {
    let DevnetState { chain, manager } = &mut state.devnet;
    let balance = manager.deposit(chain, wallet, from, amount)?;
    state.save()?;

    println!("📥 Deposited {} from {} into {}", amount, from, wallet);
    println!("   Wallet balance: {}", balance);
    Ok(())
}

/// Sweep a wallet's balance to its claimants
pub fn cmd_withdraw(state: &mut AppState, wallet: &Identity) -> CliResult<()> {
    let DevnetState { chain, manager } = &mut state.devnet;
    let payouts = manager.withdraw(chain, wallet)?;
    state.save()?;

    println!("📤 Withdrawal from {}", wallet);
    for payout in &payouts {
        println!("   └─ {} ← {}", payout.recipient, payout.amount);
    }
    Ok(())
}

/// Roll devnet state back to a backup
pub fn cmd_restore(state: &mut AppState, backup: Option<usize>) -> CliResult<()> {
    let backups = state.storage.list_backups();
    let Some(index) = backup else {
        if backups.is_empty() {
            println!("📭 No backups available");
        } else {
            println!("🗂️  Available backups (0 is the most recent): {:?}", backups);
        }
        return Ok(());
    };

    state.devnet = state.storage.restore_backup(index)?;
    state.save()?;
    println!("⏪ Restored devnet from backup {}", index);
    Ok(())
}

/// Show wallet details
pub fn cmd_show(state: &AppState, wallet: &Identity, events: usize) -> CliResult<()> {
    let instance = state
        .devnet
        .manager
        .get_wallet(wallet)
        .ok_or_else(|| format!("Wallet {} not found", wallet))?;
    let chain = &state.devnet.chain;

    println!("🔐 Wallet {} ({})", instance.address, instance.name);
    println!("   ├─ Policy: {}", instance.description());
    println!("   ├─ Nonce: {}", instance.nonce());
    println!("   ├─ Balance: {}", chain.balance_of(wallet));
    println!(
        "   ├─ Pending revenue: {}",
        chain.query_balance(instance.revenue_handle())
    );
    println!("   ├─ Fee percentage: {}%", instance.fee_percentage());
    println!("   └─ Created: {}", instance.created_at.format("%Y-%m-%d %H:%M:%S"));

    println!("\n   Owners:");
    for owner in instance.owners() {
        println!(
            "   └─ {} (allocation {})",
            owner,
            instance.allocation_of(owner)
        );
    }

    let others: Vec<(Identity, u64)> = instance
        .ledger()
        .entries()
        .into_iter()
        .filter(|(identity, _)| !instance.is_owner(identity))
        .collect();
    if !others.is_empty() {
        println!("\n   Other allocations:");
        for (identity, amount) in others {
            println!("   └─ {} (allocation {})", identity, amount);
        }
    }

    let log = instance.events();
    if events > 0 && !log.is_empty() {
        println!("\n   Recent events:");
        let start = log.len().saturating_sub(events);
        for entry in &log[start..] {
            println!("   #{} {}", entry.sequence, describe_event(&entry.event));
        }
    }
    Ok(())
}

/// List wallets, optionally only those an owner belongs to
pub fn cmd_list(state: &AppState, owner: Option<&Identity>) -> CliResult<()> {
    let manager = &state.devnet.manager;
    let wallets: Vec<Identity> = match owner {
        Some(owner) => manager.wallets_for_owner(owner),
        None => manager.list_wallets().iter().map(|w| w.address).collect(),
    };

    if wallets.is_empty() {
        println!("📭 No wallets found. Create one with: quorum create");
        return Ok(());
    }

    println!("📋 Wallets:");
    for address in &wallets {
        if let Some(wallet) = manager.get_wallet(address) {
            println!(
                "   {} ({}) - {} - {}",
                address,
                wallet.name,
                wallet.description(),
                state.devnet.chain.balance_of(address)
            );
        }
    }
    Ok(())
}

fn describe_event(event: &WalletEvent) -> String {
    match event {
        WalletEvent::Deposit { sender, amount, .. } => {
            format!("deposit {} from {}", amount, sender)
        }
        WalletEvent::Execution(record) => format!(
            "execution nonce {} -> {} value {}",
            record.nonce, record.destination, record.value
        ),
        WalletEvent::OwnerChanged { identity, added } => {
            let verb = if *added { "added" } else { "removed" };
            format!("owner {} {}", identity, verb)
        }
        WalletEvent::ThresholdChanged { threshold } => format!("threshold now {}", threshold),
        WalletEvent::FeeDistributed(split) => format!(
            "fees {} distributed to {} approvers",
            split.revenue,
            split.other_approvers.len() + 1
        ),
        WalletEvent::Payout { recipient, amount } => format!("payout {} to {}", amount, recipient),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::ProposedAction;

    fn app(temp_dir: &tempfile::TempDir) -> AppState {
        AppState::new(temp_dir.path().to_path_buf(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_state_survives_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = app(&temp_dir);
        let owner = KeyPair::generate().identity();

        cmd_create(&mut state, "solo", vec![owner], 1).unwrap();
        cmd_fund(&mut state, &owner, 50).unwrap();

        let reloaded = app(&temp_dir);
        assert_eq!(reloaded.devnet.manager.wallet_count(), 1);
        assert_eq!(reloaded.devnet.chain.balance_of(&owner), 50);
        assert_eq!(reloaded.devnet.manager.wallets_for_owner(&owner).len(), 1);
    }

    #[test]
    fn test_failed_exec_still_persists_nonce() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = app(&temp_dir);
        let key = KeyPair::generate();
        cmd_create(&mut state, "solo", vec![key.identity()], 1).unwrap();
        let wallet = state.devnet.manager.list_wallets()[0].address;

        let action = Action::Call(ProposedAction::transfer(Identity::new([9; 20]), 10));
        // No funds in the wallet, so dispatch fails
        let digest = state
            .devnet
            .manager
            .get_wallet(&wallet)
            .unwrap()
            .transaction_hash(1, &action);
        let signature = hex::encode(key.sign(digest.as_bytes()));

        let outcome = cmd_exec(
            &mut state,
            &wallet,
            key.identity(),
            action,
            &[signature],
            false,
        );
        assert!(outcome.is_err());

        let reloaded = app(&temp_dir);
        assert_eq!(reloaded.devnet.manager.get_wallet(&wallet).unwrap().nonce(), 1);
    }

    #[test]
    fn test_exec_with_sorting() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = app(&temp_dir);
        let mut keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        keys.sort_by_key(|k| k.identity());
        let owners = keys.iter().map(|k| k.identity()).collect();
        cmd_create(&mut state, "pair", owners, 2).unwrap();
        let wallet = state.devnet.manager.list_wallets()[0].address;

        cmd_fund(&mut state, &keys[0].identity(), 100).unwrap();
        cmd_deposit(&mut state, &wallet, &keys[0].identity(), 100).unwrap();

        let recipient = Identity::new([9; 20]);
        let action = Action::Call(ProposedAction::transfer(recipient, 40));
        let digest = state
            .devnet
            .manager
            .get_wallet(&wallet)
            .unwrap()
            .transaction_hash(1, &action);
        // Submitted in descending order
        let signatures: Vec<String> = keys
            .iter()
            .rev()
            .map(|k| hex::encode(k.sign(digest.as_bytes())))
            .collect();

        cmd_exec(&mut state, &wallet, keys[0].identity(), action, &signatures, true).unwrap();
        assert_eq!(state.devnet.chain.balance_of(&recipient), 40);

        cmd_withdraw(&mut state, &wallet).unwrap();
        assert_eq!(state.devnet.chain.balance_of(&wallet), 0);
        assert_eq!(state.devnet.chain.balance_of(&keys[0].identity()), 30);
        assert_eq!(state.devnet.chain.balance_of(&keys[1].identity()), 30);
    }

    #[test]
    fn test_restore_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = app(&temp_dir);
        let owner = Identity::new([1; 20]);
        cmd_fund(&mut state, &owner, 10).unwrap();
        cmd_fund(&mut state, &owner, 15).unwrap();
        assert_eq!(state.devnet.chain.balance_of(&owner), 25);

        cmd_restore(&mut state, None).unwrap();
        cmd_restore(&mut state, Some(0)).unwrap();
        assert_eq!(state.devnet.chain.balance_of(&owner), 10);
        assert_eq!(app(&temp_dir).devnet.chain.balance_of(&owner), 10);
    }

    #[test]
    fn test_init_respects_existing_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = app(&temp_dir);
        cmd_create(&mut state, "solo", vec![Identity::new([1; 20])], 1).unwrap();

        cmd_init(temp_dir.path(), &EngineConfig::default(), false).unwrap();
        assert_eq!(app(&temp_dir).devnet.manager.wallet_count(), 1);

        cmd_init(temp_dir.path(), &EngineConfig::default(), true).unwrap();
        assert_eq!(app(&temp_dir).devnet.manager.wallet_count(), 0);
    }
}
