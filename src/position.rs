//! Position Calculator
//!
//! A user's claim on a vault is `reserve * shares / totalSupply` for each
//! pool token. All math is done on raw integers; formatting happens last.

use alloy_primitives::{Address, U256};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::chain::ChainReader;
use crate::units::format_units;
use crate::vault::Vault;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPosition {
    pub share_balance: U256,
    /// Exact decimal rendering of `share_balance`
    pub share_balance_formatted: String,
    pub token0_amount: String,
    pub token1_amount: String,
    pub token0_raw: U256,
    pub token1_raw: U256,
}

impl UserPosition {
    pub fn zero() -> Self {
        Self {
            share_balance: U256::ZERO,
            share_balance_formatted: "0".to_string(),
            token0_amount: "0".to_string(),
            token1_amount: "0".to_string(),
            token0_raw: U256::ZERO,
            token1_raw: U256::ZERO,
        }
    }

    pub fn has_shares(&self) -> bool {
        !self.share_balance.is_zero()
    }
}

/// `reserve * shares / supply`, zero for an empty vault
fn pro_rata(reserve: U256, shares: U256, supply: U256) -> U256 {
    if supply.is_zero() {
        return U256::ZERO;
    }
    match reserve.checked_mul(shares) {
        Some(product) => product / supply,
        None => reserve / supply * shares,
    }
}

pub fn compute_position(
    shares: U256,
    supply: U256,
    totals: (U256, U256),
    share_decimals: u8,
    decimals0: u8,
    decimals1: u8,
) -> UserPosition {
    if shares.is_zero() {
        return UserPosition::zero();
    }

    let token0_raw = pro_rata(totals.0, shares, supply);
    let token1_raw = pro_rata(totals.1, shares, supply);

    UserPosition {
        share_balance: shares,
        share_balance_formatted: format_units(shares, share_decimals),
        token0_amount: format_units(token0_raw, decimals0),
        token1_amount: format_units(token1_raw, decimals1),
        token0_raw,
        token1_raw,
    }
}

/// Node and contract errors that just mean "nothing here"
fn means_no_position(error: &eyre::Report) -> bool {
    error.to_string().to_lowercase().contains("no position")
}

pub struct PositionCalculator {
    reader: Arc<dyn ChainReader>,
}

impl PositionCalculator {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }

    /// `None` when the reads failed; never an error
    pub async fn fetch(&self, account: Address, vault: &Vault) -> Option<UserPosition> {
        let reads = tokio::try_join!(
            self.reader.share_balance(vault.address, account),
            self.reader.total_supply(vault.address),
            self.reader.total_amounts(vault.address),
        );

        match reads {
            Ok((shares, supply, totals)) => {
                let position = compute_position(
                    shares,
                    supply,
                    totals,
                    vault.share_decimals(),
                    vault.pool.token0.decimals,
                    vault.pool.token1.decimals,
                );
                debug!(
                    "Position in {}: {} shares = {} {} + {} {}",
                    vault.name,
                    position.share_balance_formatted,
                    position.token0_amount,
                    vault.pool.token0.display_symbol(),
                    position.token1_amount,
                    vault.pool.token1.display_symbol(),
                );
                Some(position)
            }
            Err(e) if means_no_position(&e) => Some(UserPosition::zero()),
            Err(e) => {
                warn!("Failed to fetch position in {:?}: {}", vault.address, e);
                None
            }
        }
    }

    /// Position in every vault, concurrently. Failed vaults count as empty.
    pub async fn fetch_all(&self, account: Address, vaults: &[Vault]) -> Vec<(Address, UserPosition)> {
        let positions = join_all(vaults.iter().map(|vault| self.fetch(account, vault))).await;

        vaults
            .iter()
            .zip(positions)
            .map(|(vault, position)| (vault.address, position.unwrap_or_else(UserPosition::zero)))
            .collect()
    }
}
