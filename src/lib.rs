//! vaultkeeper - deposit/withdraw client for Hedera liquidity vaults
//!
//! - `resolver`: pool token → Hedera token id
//! - `executor`: approval, deposit and withdraw orchestration
//! - `position`: the user's share of a vault's reserves

pub mod api;
pub mod balances;
pub mod chain;
pub mod config;
pub mod executor;
pub mod position;
pub mod resolver;
pub mod tokens;
pub mod units;
pub mod vault;

#[cfg(test)]
pub(crate) mod testutil;
