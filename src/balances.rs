//! Wallet balances for every token that appears in a vault

use alloy_primitives::{Address, U256};
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::chain::ChainReader;
use crate::tokens::TokenDescriptor;
use crate::units::{format_units, scale, NATIVE_DECIMALS};
use crate::vault::Vault;

/// Common precision used to compare balances across decimals
const COMPARE_DECIMALS: u8 = 36;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBalance {
    pub token: TokenDescriptor,
    pub balance: U256,
    pub balance_formatted: String,
}

impl TokenBalance {
    fn decimals(&self) -> u8 {
        if self.token.is_native() {
            NATIVE_DECIMALS
        } else {
            self.token.decimals
        }
    }

    fn normalized(&self) -> U256 {
        let decimals = self.decimals().min(COMPARE_DECIMALS);
        self.balance.saturating_mul(scale(COMPARE_DECIMALS - decimals))
    }
}

/// Tokens across all vaults, first occurrence wins, keyed by address
pub fn unique_tokens(vaults: &[Vault]) -> Vec<TokenDescriptor> {
    let mut seen = HashSet::new();
    vaults
        .iter()
        .flat_map(|v| [&v.pool.token0, &v.pool.token1])
        .filter(|t| seen.insert(t.address.trim().to_lowercase()))
        .cloned()
        .collect()
}

async fn balance_of(reader: &dyn ChainReader, token: &TokenDescriptor, owner: Address) -> U256 {
    let result = if token.is_native() {
        reader.native_balance(owner).await
    } else {
        match token.evm_address() {
            Some(address) => reader.token_balance(address, owner).await,
            None => Err(eyre::eyre!("unusable token address {}", token.address)),
        }
    };

    result.unwrap_or_else(|e| {
        warn!("Failed to fetch balance for {}: {}", token.display_symbol(), e);
        U256::ZERO
    })
}

/// Largest holdings first, ties by symbol
pub async fn fetch_balances(reader: &dyn ChainReader, owner: Address, vaults: &[Vault]) -> Vec<TokenBalance> {
    let tokens = unique_tokens(vaults);
    let raw = join_all(tokens.iter().map(|t| balance_of(reader, t, owner))).await;

    let mut balances: Vec<TokenBalance> = tokens
        .into_iter()
        .zip(raw)
        .map(|(token, balance)| {
            let decimals = if token.is_native() { NATIVE_DECIMALS } else { token.decimals };
            TokenBalance {
                balance_formatted: format_units(balance, decimals),
                token,
                balance,
            }
        })
        .collect();

    balances.sort_by(|a, b| match b.normalized().cmp(&a.normalized()) {
        Ordering::Equal => a.token.display_symbol().cmp(b.token.display_symbol()),
        other => other,
    });

    debug!("Fetched {} token balances", balances.len());
    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeReader;
    use crate::vault::sample_vault;
    use std::str::FromStr;

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    #[test]
    fn test_unique_tokens() {
        let a = sample_vault(false, true);
        let mut b = sample_vault(false, true);
        b.pool.token1.address = "0x0000000000000000000000000000000000120F46".to_string();
        b.pool.token1.symbol = "SAUCE".to_string();
        b.pool.token1.is_native_wrapper = false;

        let tokens = unique_tokens(&[a, b]);
        let symbols: Vec<_> = tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["USDC", "WHBAR", "SAUCE"]);
    }

    #[tokio::test]
    async fn test_balances_sorted_and_failures_zeroed() {
        let mut second = sample_vault(false, true);
        second.pool.token1.address = "0x0000000000000000000000000000000000120f46".to_string();
        second.pool.token1.symbol = "SAUCE".to_string();
        second.pool.token1.decimals = 6;
        second.pool.token1.is_native_wrapper = false;

        let mut reader = FakeReader {
            // 3 HBAR
            native: U256::from(3u64) * scale(18),
            ..Default::default()
        };
        // 7 USDC; SAUCE has no entry so its read fails
        reader
            .token_balances
            .insert(addr("0x000000000000000000000000000000000006f89a"), U256::from(7_000_000u64));

        let balances = fetch_balances(&reader, Address::ZERO, &[sample_vault(false, true), second]).await;

        let summary: Vec<_> = balances
            .iter()
            .map(|b| (b.token.display_symbol().to_string(), b.balance_formatted.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("USDC".to_string(), "7".to_string()),
                ("HBAR".to_string(), "3".to_string()),
                ("SAUCE".to_string(), "0".to_string()),
            ]
        );
    }
}
