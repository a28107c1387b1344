//! Diagnostic tool - Check configuration and connectivity
//!
//! Run with: cargo run --bin diagnose

use alloy_provider::Provider;
use std::env;
use std::time::Instant;

use vaultkeeper::api::ApiClient;
use vaultkeeper::chain::{RpcChainReader, SignerWallet, Wallet};
use vaultkeeper::config::Config;

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

#[tokio::main]
async fn main() {
    println!("🔍 VAULTKEEPER DIAGNOSTIC CHECK\n");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("❌ Could not load configuration: {}", e);
            return;
        }
    };

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let keys = [
        ("VAULTKEEPER_NETWORK", "Active network"),
        ("RPC_URL", "JSON-RPC relay override"),
        ("MIRROR_NODE_URL", "Mirror node override"),
        ("API_BASE_URL", "Vault listing backend"),
        ("CHAT_BASE_URL", "AI chat relay"),
        ("CONFIRM_TRANSACTIONS", "Prompt before signing"),
    ];

    for (key, desc) in keys {
        let marker = if env::var(key).is_ok() { "(from .env)" } else { "(default)" };
        println!("  {} {}", key, marker);
        println!("    └─ {}\n", desc);
    }

    config.print_summary();

    let validation = config.validate();
    println!("\n  Config valid: {}", mark(validation.is_ok()));
    if let Err(e) = validation {
        println!("    └─ {}", e);
    }

    println!("\n═══════════════════════════════════════════════════");
    println!("                  CONNECTIVITY                      ");
    println!("═══════════════════════════════════════════════════\n");

    // RPC relay
    let rpc_url = config.effective_rpc_url();
    match RpcChainReader::new(&rpc_url) {
        Ok(reader) => {
            let start = Instant::now();
            match reader.provider().get_chain_id().await {
                Ok(chain_id) => {
                    let expected = config.chain_id();
                    println!(
                        "  RPC relay:   {} chain {} in {:?} (expected {})",
                        mark(chain_id == expected),
                        chain_id,
                        start.elapsed(),
                        expected
                    );
                }
                Err(e) => println!("  RPC relay:   ❌ {}", e),
            }
        }
        Err(e) => println!("  RPC relay:   ❌ {}", e),
    }

    // Vault backend
    match ApiClient::new(&config) {
        Ok(api) => {
            let start = Instant::now();
            match api.list_vaults().await {
                Ok(vaults) => println!(
                    "  Vault API:   ✅ {} vaults in {:?}",
                    vaults.len(),
                    start.elapsed()
                ),
                Err(e) => println!("  Vault API:   ❌ {}", e),
            }
        }
        Err(e) => println!("  Vault API:   ❌ {}", e),
    }

    // Mirror node
    let mirror = format!("{}/network/nodes?limit=1", config.mirror_api_url());
    match reqwest::get(&mirror).await {
        Ok(response) => println!(
            "  Mirror node: {} HTTP {}",
            mark(response.status().is_success()),
            response.status()
        ),
        Err(e) => println!("  Mirror node: ❌ {}", e),
    }

    println!("\n═══════════════════════════════════════════════════");
    println!("                     WALLET                         ");
    println!("═══════════════════════════════════════════════════\n");

    if config.wallet_private_key.is_none() {
        println!("  WALLET_PRIVATE_KEY: ❌ Not set (read-only commands still work)");
        println!("\n  💡 Run `cargo run --bin generate-wallet` to create one");
        return;
    }

    match SignerWallet::from_config(&config) {
        Ok(wallet) => {
            println!("  Address: {:?}", wallet.address());
            match wallet.ensure_chain(config.chain_id()).await {
                Ok(()) => println!("  Chain:   ✅ {}", config.network),
                Err(e) => println!("  Chain:   ❌ {}", e),
            }
        }
        Err(e) => println!("  WALLET_PRIVATE_KEY: ❌ {}", e),
    }

    println!();
}
