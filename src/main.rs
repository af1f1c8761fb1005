//! Quorum wallet CLI
//!
//! Drives threshold wallets on a local in-memory devnet.

use clap::{Parser, Subcommand};
use quorum_wallet::cli::{self, AppState};
use quorum_wallet::config::EngineConfig;
use quorum_wallet::multisig::{Action, Identity, ProposedAction};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quorum")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Threshold multi-signature wallets with fee sharing", long_about = None)]
struct Cli {
    /// Data directory for devnet state
    #[arg(short, long, default_value = ".quorum_data")]
    data_dir: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(short, long, default_value = "quorum.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new devnet
    Init {
        /// Delete any existing state
        #[arg(long)]
        force: bool,
    },

    /// Generate signing keys
    Keygen {
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Mint devnet funds to an account
    Fund {
        #[arg(short, long)]
        to: Identity,

        #[arg(short, long)]
        amount: u64,
    },

    /// Accrue revenue for a wallet
    Accrue {
        #[arg(short, long)]
        wallet: Identity,

        #[arg(short, long)]
        amount: u64,
    },

    /// Create a multisig wallet
    Create {
        #[arg(short, long)]
        name: String,

        /// Comma-separated owner identities
        #[arg(short, long, value_delimiter = ',', required = true)]
        owners: Vec<Identity>,

        /// Required signatures
        #[arg(short, long)]
        threshold: usize,
    },

    /// Print the digest to sign for an action
    Hash {
        #[arg(short, long)]
        wallet: Identity,

        /// Nonce to hash at (defaults to the wallet's current nonce)
        #[arg(long)]
        nonce: Option<u64>,

        #[command(subcommand)]
        action: ActionCommand,
    },

    /// Sign a digest
    Sign {
        /// Hex digest from `hash`
        #[arg(short, long)]
        digest: String,

        /// Hex private key
        #[arg(short, long)]
        key: String,
    },

    /// Execute an authorized action
    Exec {
        #[arg(short, long)]
        wallet: Identity,

        /// Identity submitting the execution
        #[arg(short, long)]
        caller: Identity,

        /// Comma-separated hex signatures, ascending by signer
        #[arg(short, long, value_delimiter = ',')]
        sigs: Vec<String>,

        /// Order signatures by signer before submitting
        #[arg(long)]
        sort: bool,

        #[command(subcommand)]
        action: ActionCommand,
    },

    /// Deposit funds into a wallet
    Deposit {
        #[arg(short, long)]
        wallet: Identity,

        #[arg(short, long)]
        from: Identity,

        #[arg(short, long)]
        amount: u64,
    },

    /// Sweep a wallet's balance to owners and fee earners
    Withdraw {
        #[arg(short, long)]
        wallet: Identity,
    },

    /// Show wallet details
    Show {
        #[arg(short, long)]
        wallet: Identity,

        /// Number of recent events to display
        #[arg(short, long, default_value = "10")]
        events: usize,
    },

    /// List or restore state backups
    Restore {
        /// Backup index to restore; lists backups when omitted
        #[arg(short, long)]
        backup: Option<usize>,
    },

    /// List wallets
    List {
        /// Only wallets this identity owns
        #[arg(short, long)]
        owner: Option<Identity>,
    },
}

#[derive(Subcommand)]
enum ActionCommand {
    /// Call or transfer to a destination
    Call {
        #[arg(short, long)]
        to: Identity,

        #[arg(short, long, default_value = "0")]
        value: u64,

        /// Hex call payload
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// Add an owner and set the threshold
    AddOwner {
        #[arg(short, long)]
        owner: Identity,

        #[arg(short, long)]
        threshold: usize,
    },

    /// Remove an owner and set the threshold
    RemoveOwner {
        #[arg(short, long)]
        owner: Identity,

        #[arg(short, long)]
        threshold: usize,
    },

    /// Change the threshold
    Threshold {
        #[arg(short, long)]
        threshold: usize,
    },
}

impl ActionCommand {
    fn into_action(self) -> Result<Action, hex::FromHexError> {
        Ok(match self {
            ActionCommand::Call { to, value, payload } => {
                let payload = match payload {
                    Some(text) => hex::decode(text.trim_start_matches("0x"))?,
                    None => Vec::new(),
                };
                Action::Call(ProposedAction::new(to, value, payload))
            }
            ActionCommand::AddOwner { owner, threshold } => Action::AddOwner { owner, threshold },
            ActionCommand::RemoveOwner { owner, threshold } => {
                Action::RemoveOwner { owner, threshold }
            }
            ActionCommand::Threshold { threshold } => Action::ChangeThreshold { threshold },
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = EngineConfig::load_or_default(&cli.config)?;

    // Commands that don't need devnet state
    match &cli.command {
        Commands::Init { force } => return cli::cmd_init(&cli.data_dir, &config, *force),
        Commands::Keygen { count } => return cli::cmd_keygen(*count),
        Commands::Sign { digest, key } => return cli::cmd_sign(digest, key),
        _ => {}
    }

    let mut state = AppState::new(cli.data_dir.clone(), &config)?;

    match cli.command {
        Commands::Init { .. } | Commands::Keygen { .. } | Commands::Sign { .. } => unreachable!(),

        Commands::Fund { to, amount } => {
            cli::cmd_fund(&mut state, &to, amount)?;
        }

        Commands::Accrue { wallet, amount } => {
            cli::cmd_accrue(&mut state, &wallet, amount)?;
        }

        Commands::Create {
            name,
            owners,
            threshold,
        } => {
            cli::cmd_create(&mut state, &name, owners, threshold)?;
        }

        Commands::Hash {
            wallet,
            nonce,
            action,
        } => {
            cli::cmd_hash(&state, &wallet, &action.into_action()?, nonce)?;
        }

        Commands::Exec {
            wallet,
            caller,
            sigs,
            sort,
            action,
        } => {
            cli::cmd_exec(&mut state, &wallet, caller, action.into_action()?, &sigs, sort)?;
        }

        Commands::Deposit {
            wallet,
            from,
            amount,
        } => {
            cli::cmd_deposit(&mut state, &wallet, &from, amount)?;
        }

        Commands::Withdraw { wallet } => {
            cli::cmd_withdraw(&mut state, &wallet)?;
        }

        Commands::Show { wallet, events } => {
            cli::cmd_show(&state, &wallet, events)?;
        }

        Commands::Restore { backup } => {
            cli::cmd_restore(&mut state, backup)?;
        }

        Commands::List { owner } => {
            cli::cmd_list(&state, owner.as_ref())?;
        }
    }

    Ok(())
}
