//! Vault snapshot as consumed by the executor and position calculator

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::tokens::TokenDescriptor;
use crate::units::SHARE_DECIMALS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub address: String,
    pub token0: TokenDescriptor,
    pub token1: TokenDescriptor,
    pub fee: u32,
    pub tick_spacing: i32,
    pub current_tick: i32,
    pub sqrt_price_x96: String,
    pub price0: f64,
    pub price1: f64,
}

/// TVL split per pool token, in token units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tvl {
    pub tvl0: f64,
    pub tvl1: f64,
}

/// Position the vault itself holds in the pool, as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolPosition {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: f64,
    pub amount0: f64,
    pub amount1: f64,
    pub fees0: f64,
    pub fees1: f64,
}

/// One liquidity vault. Immutable snapshot; re-fetched to refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub pool: Pool,
    pub total_supply: f64,
    pub lower_tick: i32,
    pub upper_tick: i32,
    pub is_active: bool,
    pub tvl: Option<Tvl>,
    pub position: Option<PoolPosition>,
}

impl Vault {
    pub fn share_decimals(&self) -> u8 {
        if self.decimals == 0 {
            SHARE_DECIMALS
        } else {
            self.decimals
        }
    }

    /// Index of the leg paid in HBAR, if the pool has one
    pub fn native_leg(&self) -> Option<usize> {
        if self.pool.token0.is_native() {
            Some(0)
        } else if self.pool.token1.is_native() {
            Some(1)
        } else {
            None
        }
    }

    pub fn in_range(&self) -> bool {
        self.pool.current_tick >= self.lower_tick && self.pool.current_tick < self.upper_tick
    }

    pub fn pair_label(&self) -> String {
        format!(
            "{}/{}",
            self.pool.token0.display_symbol(),
            self.pool.token1.display_symbol()
        )
    }
}

/// Find a vault by (case-insensitive) address
pub fn find_vault<'a>(vaults: &'a [Vault], address: &str) -> Option<&'a Vault> {
    let wanted = Address::from_str(address.trim()).ok()?;
    vaults.iter().find(|v| v.address == wanted)
}

#[cfg(test)]
pub(crate) fn sample_vault(token0_native: bool, token1_native: bool) -> Vault {
    let token = |symbol: &str, address: &str, decimals: u8, native: bool| TokenDescriptor {
        address: address.to_string(),
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        decimals,
        is_native_wrapper: native,
    };

    Vault {
        address: Address::from_str("0x00000000000000000000000000000000005a1b2c").unwrap(),
        name: "Mani Vault USDC-WHBAR".to_string(),
        symbol: "MVLT".to_string(),
        decimals: 18,
        pool: Pool {
            address: "0x0000000000000000000000000000000000388a2b".to_string(),
            token0: token(
                "USDC",
                "0x000000000000000000000000000000000006f89a",
                6,
                token0_native,
            ),
            token1: token(
                "WHBAR",
                "0x0000000000000000000000000000000000163b5a",
                8,
                token1_native,
            ),
            fee: 1500,
            tick_spacing: 30,
            current_tick: -120,
            sqrt_price_x96: "79228162514264337593543950336".to_string(),
            price0: 1.0,
            price1: 1.0,
        },
        total_supply: 1000.0,
        lower_tick: -600,
        upper_tick: 600,
        is_active: true,
        tvl: None,
        position: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_leg() {
        assert_eq!(sample_vault(false, true).native_leg(), Some(1));
        assert_eq!(sample_vault(true, false).native_leg(), Some(0));
        assert_eq!(sample_vault(false, false).native_leg(), None);

        // placeholder address without the wrapper flag
        let mut vault = sample_vault(false, false);
        vault.pool.token1.address = "0x0000000000000000000000000000000000003aD2".to_string();
        assert_eq!(vault.native_leg(), Some(1));
    }

    #[test]
    fn test_pair_label_uses_display_symbols() {
        assert_eq!(sample_vault(false, true).pair_label(), "USDC/HBAR");
    }

    #[test]
    fn test_find_vault_ignores_case() {
        let vaults = vec![sample_vault(false, true)];
        assert!(find_vault(&vaults, "0x00000000000000000000000000000000005A1B2C").is_some());
        assert!(find_vault(&vaults, "0x0000000000000000000000000000000000000001").is_none());
        assert!(find_vault(&vaults, "garbage").is_none());
    }

    #[test]
    fn test_in_range() {
        let mut vault = sample_vault(false, true);
        assert!(vault.in_range());
        vault.pool.current_tick = 600;
        assert!(!vault.in_range());
    }
}
