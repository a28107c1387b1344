//! vaultkeeper - Hedera liquidity vault client
//!
//! Run with: cargo run -- <command>
//!
//! Commands:
//! - vaults / info / position / balances: read-only
//! - deposit / withdraw: sign and send (WALLET_PRIVATE_KEY required)
//! - chat: ask the AI relay about your vaults
//! - watch: refresh vaults and positions periodically

use alloy_primitives::Address;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vaultkeeper::api::{ApiClient, ChatClient, ChatRequest};
use vaultkeeper::balances::fetch_balances;
use vaultkeeper::chain::{ChainReader, ContractCall, RpcChainReader, SignerWallet, Wallet};
use vaultkeeper::config::Config;
use vaultkeeper::executor::{ExecutorError, ExecutorSettings, TransactionStage, VaultExecutor};
use vaultkeeper::position::PositionCalculator;
use vaultkeeper::resolver::{MirrorNodeClient, TokenResolver};
use vaultkeeper::units::format_fixed;
use vaultkeeper::vault::{find_vault, Vault};

#[derive(Parser)]
#[command(name = "vaultkeeper", version, about = "Deposit into and withdraw from Hedera liquidity vaults")]
struct Cli {
    /// TOML config file; environment variables are used when omitted
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct AccountArg {
    /// Account to inspect (defaults to the configured wallet)
    #[arg(long)]
    account: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List vaults from the backend
    Vaults,

    /// On-chain metadata of one vault
    Info {
        vault: String,
    },

    /// Your share of one vault, or of every vault
    Position {
        vault: Option<String>,
        #[command(flatten)]
        account: AccountArg,
    },

    /// Wallet balances of every token used by a vault
    Balances {
        #[command(flatten)]
        account: AccountArg,
    },

    /// Deposit one or both pool tokens
    Deposit {
        vault: String,
        /// Amount of token0 (decimal)
        #[arg(long, default_value = "0")]
        amount0: String,
        /// Amount of token1 (decimal)
        #[arg(long, default_value = "0")]
        amount1: String,
        /// Sign without asking
        #[arg(long, short)]
        yes: bool,
    },

    /// Burn vault shares
    Withdraw {
        vault: String,
        /// Shares to burn (decimal)
        #[arg(long, conflicts_with = "percent", required_unless_present = "percent")]
        shares: Option<String>,
        /// Percentage of your shares to burn
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        percent: Option<u8>,
        #[arg(long, short)]
        yes: bool,
    },

    /// Send a message to the AI assistant
    Chat {
        message: Vec<String>,
        #[command(flatten)]
        account: AccountArg,
    },

    /// Refresh vaults and positions every REFRESH_INTERVAL_SECS
    Watch {
        #[command(flatten)]
        account: AccountArg,
    },
}

fn print_banner(config: &Config) {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(format!(" 🏦 VAULTKEEPER - Hedera {} ", config.network)).cyan().bold()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }
    Ok(config)
}

/// `--account`, else the address of the configured key
fn account_for(arg: &AccountArg, config: &Config) -> Result<Address> {
    if let Some(account) = &arg.account {
        return Address::from_str(account.trim()).map_err(|e| eyre!("Invalid account {}: {}", account, e));
    }
    let wallet = SignerWallet::from_config(config)
        .map_err(|e| eyre!("{} (or pass --account)", e))?;
    Ok(wallet.address())
}

async fn load_vault(api: &ApiClient, address: &str) -> Result<Vault> {
    let vaults = api.list_vaults().await?;
    find_vault(&vaults, address)
        .cloned()
        .ok_or_else(|| eyre!("Vault {} not found in backend listing", address))
}

fn print_vaults(vaults: &[Vault]) {
    println!(
        "{} {} vaults",
        style("✓").green(),
        vaults.len()
    );
    for vault in vaults {
        let status = if vault.is_active {
            style("active").green()
        } else {
            style("inactive").red()
        };
        let range = if vault.in_range() { "in range" } else { "out of range" };
        println!(
            "  {} {} [{}] fee {:.2}% | ticks {}..{} ({}) | {}",
            style(&vault.name).bold(),
            style(vault.pair_label()).cyan(),
            vault.address,
            vault.pool.fee as f64 / 10_000.0,
            vault.lower_tick,
            vault.upper_tick,
            range,
            status
        );
        if let Some(tvl) = vault.tvl {
            println!(
                "      TVL: {:.4} {} + {:.4} {}",
                tvl.tvl0,
                vault.pool.token0.display_symbol(),
                tvl.tvl1,
                vault.pool.token1.display_symbol()
            );
        }
    }
}

/// Terminal stand-in for a wallet popup
fn confirm_on_terminal(call: &ContractCall) -> bool {
    println!();
    println!("{} {}", style("✍️  Signature requested:").yellow().bold(), call.description);
    println!("   to: {}  value: {}  gas: {}", call.to, call.value, call.gas_limit);
    print!("   Sign this transaction? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn build_executor(config: &Config, vault: Vault, skip_prompt: bool) -> Result<VaultExecutor> {
    let mut wallet = SignerWallet::from_config(config)?;
    if config.confirm_transactions && !skip_prompt {
        wallet = wallet.with_confirmation(Arc::new(confirm_on_terminal));
    }

    let reader = Arc::new(RpcChainReader::new(&config.effective_rpc_url())?);
    let index = Arc::new(MirrorNodeClient::from_config(config)?);
    let resolver = Arc::new(TokenResolver::new(config.network, index));

    Ok(VaultExecutor::new(
        vault,
        Arc::new(wallet),
        reader,
        resolver,
        ExecutorSettings::from_config(config),
    ))
}

/// Spinner following the executor's stage. Hidden while prompts may be shown.
fn track_stages(executor: &VaultExecutor, visible: bool) -> (ProgressBar, tokio::task::JoinHandle<()>) {
    let mut rx = executor.stage().subscribe();
    let spinner = if visible {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    let bar = spinner.clone();
    let handle = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let stage = *rx.borrow_and_update();
            let message = match stage {
                TransactionStage::Idle => "Waiting",
                TransactionStage::Approving => "Approving token allowance...",
                TransactionStage::Depositing => "Submitting deposit...",
                TransactionStage::Withdrawing => "Submitting withdrawal...",
                TransactionStage::Confirming => "Waiting for confirmation...",
                TransactionStage::Success | TransactionStage::Error => "Done",
            };
            bar.set_message(message);
        }
    });

    (spinner, handle)
}

fn report(action: &str, result: std::result::Result<alloy_primitives::TxHash, ExecutorError>) -> Result<()> {
    match result {
        Ok(tx_hash) => {
            println!("{} {} confirmed: {}", style("✓").green(), action, tx_hash);
            Ok(())
        }
        Err(ExecutorError::UserCancelled) => {
            println!("{} {} cancelled", style("○").yellow(), action);
            Ok(())
        }
        Err(e) => Err(eyre!("{} failed: {}", action, e)),
    }
}

async fn show_positions(config: &Config, api: &ApiClient, account: Address, only: Option<&str>) -> Result<()> {
    let reader: Arc<dyn ChainReader> = Arc::new(RpcChainReader::new(&config.effective_rpc_url())?);
    let calculator = PositionCalculator::new(reader);
    let vaults = api.list_vaults().await?;

    let selected: Vec<Vault> = match only {
        Some(address) => vec![find_vault(&vaults, address)
            .cloned()
            .ok_or_else(|| eyre!("Vault {} not found in backend listing", address))?],
        None => vaults,
    };

    for (vault, (_, position)) in selected.iter().zip(calculator.fetch_all(account, &selected).await) {
        if only.is_none() && !position.has_shares() {
            continue;
        }
        println!(
            "  {} {}: {} shares = {} {} + {} {}",
            style(&vault.name).bold(),
            style(vault.pair_label()).cyan(),
            format_fixed(position.share_balance, vault.share_decimals(), 6),
            format_fixed(position.token0_raw, vault.pool.token0.decimals, 6),
            vault.pool.token0.display_symbol(),
            format_fixed(position.token1_raw, vault.pool.token1.decimals, 6),
            vault.pool.token1.display_symbol(),
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vaultkeeper=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    print_banner(&config);
    if config.is_development() {
        config.print_summary();
        println!();
    }

    let api = ApiClient::new(&config)?;

    match cli.command {
        Command::Vaults => {
            let vaults = api.list_vaults().await?;
            print_vaults(&vaults);
        }

        Command::Info { vault } => {
            let reader = RpcChainReader::new(&config.effective_rpc_url())?;
            let address = Address::from_str(vault.trim()).map_err(|e| eyre!("Invalid vault {}: {}", vault, e))?;
            let (info, supply, (total0, total1)) = tokio::try_join!(
                reader.vault_info(address),
                reader.total_supply(address),
                reader.total_amounts(address),
            )?;

            println!("  {} ({})", style(&info.name).bold(), info.symbol);
            println!("  Ticks:        {}..{}", info.lower_tick, info.upper_tick);
            println!("  Active:       {}", info.is_active);
            println!("  Total supply: {}", supply);
            println!("  Reserves:     {} / {}", total0, total1);
        }

        Command::Position { vault, account } => {
            let account = account_for(&account, &config)?;
            info!("Positions for {:?}", account);
            show_positions(&config, &api, account, vault.as_deref()).await?;
        }

        Command::Balances { account } => {
            let account = account_for(&account, &config)?;
            let reader = RpcChainReader::new(&config.effective_rpc_url())?;
            let vaults = api.list_vaults().await?;

            for balance in fetch_balances(&reader, account, &vaults).await {
                println!(
                    "  {:>8} {} ({})",
                    style(balance.token.display_symbol()).bold(),
                    balance.balance_formatted,
                    balance.token.display_name()
                );
            }
        }

        Command::Deposit { vault, amount0, amount1, yes } => {
            let vault = load_vault(&api, &vault).await?;
            println!(
                "{} Depositing {} {} + {} {} into {}",
                style("→").cyan(),
                amount0,
                vault.pool.token0.display_symbol(),
                amount1,
                vault.pool.token1.display_symbol(),
                vault.name
            );

            let executor = build_executor(&config, vault, yes).await?;
            let (spinner, tracker) = track_stages(&executor, yes || !config.confirm_transactions);
            let result = executor.deposit(&amount0, &amount1).await;
            tracker.abort();
            spinner.finish_and_clear();
            report("Deposit", result)?;
        }

        Command::Withdraw { vault, shares, percent, yes } => {
            let vault = load_vault(&api, &vault).await?;
            let executor = build_executor(&config, vault, yes).await?;

            let position = executor
                .load_position()
                .await
                .ok_or_else(|| eyre!("Could not read your position"))?;
            println!(
                "{} You hold {} shares",
                style("→").cyan(),
                position.share_balance_formatted
            );

            let (spinner, tracker) = track_stages(&executor, yes || !config.confirm_transactions);
            let result = match (shares, percent) {
                (Some(shares), _) => executor.withdraw(&shares).await,
                (None, Some(percent)) => executor.withdraw_percent(percent).await,
                (None, None) => Err(ExecutorError::Validation("Pass --shares or --percent".to_string())),
            };
            tracker.abort();
            spinner.finish_and_clear();
            report("Withdraw", result)?;

            executor.wait_for_refresh().await;
            if let Some(position) = executor.position().await {
                println!(
                    "{} Remaining: {} shares",
                    style("✓").green(),
                    position.share_balance_formatted
                );
            }
        }

        Command::Chat { message, account } => {
            let account = account_for(&account, &config)?;
            let chat = ChatClient::new(&config)?;
            let request = ChatRequest::new(format!("{:?}", account), message.join(" "), config.network);

            let reply = chat.send_message(&request).await?;
            println!(
                "{} {}",
                style(format!("[{}] assistant:", chrono::Local::now().format("%H:%M:%S"))).magenta(),
                reply
            );
        }

        Command::Watch { account } => {
            let account = account_for(&account, &config)?;
            let mut ticker = tokio::time::interval(Duration::from_secs(config.refresh_interval_secs.max(1)));

            loop {
                ticker.tick().await;
                println!(
                    "{}",
                    style(format!("── {} ──", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))).dim()
                );
                match api.list_vaults().await {
                    Ok(vaults) => print_vaults(&vaults),
                    Err(e) => warn!("Vault refresh failed: {}", e),
                }
                if let Err(e) = show_positions(&config, &api, account, None).await {
                    warn!("Position refresh failed: {}", e);
                }
            }
        }
    }

    Ok(())
}
