// src/main.rs
//! Offline wallet CLI: mnemonics, address derivation and address checks.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ela_wallet::core::derivation::DerivationEngine;
use ela_wallet::core::key_ring::PublicKeyRing;
use ela_wallet::core::wallet_info::{WalletInfo, WalletKind};
use ela_wallet::security::RootMaterial;
use ela_wallet::{subwallet, ChainId, MasterWallet, MasterWalletManager, NetworkType, WalletConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "wallet-cli")]
#[command(about = "Elastos multi-chain wallet tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// trace, debug, info, warn, error or off. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// MainNet, TestNet, RegTest or PrvNet. Overrides the config file.
    #[arg(long, global = true)]
    network: Option<NetworkType>,

    /// TOML configuration file.
    #[arg(long, global = true, env = "WALLET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh 12 word English mnemonic
    GenerateMnemonic,
    /// Derive receiving addresses of a chain from a mnemonic
    Addresses {
        #[arg(long)]
        chain: ChainId,
        #[arg(long, default_value = "5")]
        count: u32,
        #[arg(long, default_value = "0")]
        index: u32,
        /// Change addresses instead of receiving addresses
        #[arg(long)]
        internal: bool,
        #[arg(long, env = "WALLET_MNEMONIC", hide_env_values = true)]
        mnemonic: String,
        #[arg(long, env = "WALLET_PASSPHRASE", hide_env_values = true, default_value = "")]
        passphrase: String,
    },
    /// Check an address against a chain
    ValidateAddress {
        #[arg(long)]
        chain: ChainId,
        address: String,
    },
    /// Print the engine version
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref())?;

    let mut config = match &args.config {
        Some(path) => WalletConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => WalletConfig::default(),
    };
    if let Some(network) = args.network {
        config.network = network;
    }
    debug!(network = %config.network, "configuration loaded");
    let manager = MasterWalletManager::new(config)?;

    match args.command {
        Commands::GenerateMnemonic => {
            let mnemonic = manager.generate_mnemonic("english")?;
            println!("{}", mnemonic.as_str());
        }
        Commands::Addresses { chain, count, index, internal, mnemonic, passphrase } => {
            for address in derive_addresses(&manager, chain, index, count, internal, &mnemonic, &passphrase)? {
                println!("{}", address);
            }
        }
        Commands::ValidateAddress { chain, address } => {
            let valid = manager.is_sub_wallet_address_valid(chain.as_str(), &address)?;
            println!("{}", valid);
            if !valid {
                std::process::exit(1);
            }
        }
        Commands::Version => println!("{}", manager.get_version()),
    }
    Ok(())
}

/// Derives addresses through a watch-only wallet; nothing is sealed or kept.
fn derive_addresses(
    manager: &MasterWalletManager,
    chain: ChainId,
    index: u32,
    count: u32,
    internal: bool,
    mnemonic: &str,
    passphrase: &str,
) -> Result<Vec<String>> {
    let (mnemonic, seed) = DerivationEngine::derive_seed(mnemonic, passphrase)?;
    let root = RootMaterial::Seed { seed, mnemonic: Some(mnemonic) };
    let keys = PublicKeyRing::from_root(manager.engine(), &root, Vec::new(), 1)?;
    drop(root);

    let info = WalletInfo::new("cli", WalletKind::Seed, false, !passphrase.is_empty(), 1, 1);
    let wallet = Arc::new(MasterWallet::new(info, manager.config().clone(), keys, None));
    let sub = subwallet::open(wallet, chain)?;
    info!(%chain, index, count, "deriving addresses");
    Ok(sub.get_addresses(index, count, internal)?)
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
