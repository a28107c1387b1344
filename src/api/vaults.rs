//! Vault listing backend (`GET /vaults`)

use alloy_primitives::Address;
use eyre::{eyre, Result};
use reqwest::Client;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::tokens::TokenDescriptor;
use crate::vault::{Pool, PoolPosition, Tvl, Vault};

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Clone, Deserialize)]
pub struct BackendToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub is_native_wrapper: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendPool {
    pub address: String,
    pub token0: BackendToken,
    pub token1: BackendToken,
    pub fee: u32,
    #[serde(default)]
    pub tick_spacing: i32,
    #[serde(default)]
    pub current_tick: i32,
    #[serde(default)]
    pub sqrt_price_x96: String,
    #[serde(default)]
    pub price0: f64,
    #[serde(default)]
    pub price1: f64,
}

/// The backend sends TVL either as a split object or as a preformatted string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BackendTvl {
    Split { tvl0: f64, tvl1: f64 },
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendVault {
    pub address: String,
    pub pool: BackendPool,
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default)]
    pub total_supply: f64,
    #[serde(default)]
    pub lower_tick: i32,
    #[serde(default)]
    pub upper_tick: i32,
    #[serde(default)]
    pub is_active: bool,
    pub tvl0: Option<f64>,
    pub tvl1: Option<f64>,
    pub tvl: Option<BackendTvl>,
    pub position: Option<PoolPosition>,
}

fn default_decimals() -> u8 {
    18
}

impl From<BackendToken> for TokenDescriptor {
    fn from(token: BackendToken) -> Self {
        TokenDescriptor {
            address: token.address,
            symbol: token.symbol,
            name: token.name,
            decimals: token.decimals,
            is_native_wrapper: token.is_native_wrapper,
        }
    }
}

impl BackendVault {
    /// TVL from the split object, else the flat fields. A string TVL carries no
    /// per-token numbers and is dropped.
    fn tvl(&self) -> Option<Tvl> {
        match (&self.tvl, self.tvl0, self.tvl1) {
            (Some(BackendTvl::Split { tvl0, tvl1 }), _, _) => Some(Tvl { tvl0: *tvl0, tvl1: *tvl1 }),
            (_, Some(tvl0), Some(tvl1)) => Some(Tvl { tvl0, tvl1 }),
            _ => None,
        }
    }

    pub fn into_vault(self) -> Result<Vault> {
        let address = Address::from_str(self.address.trim())
            .map_err(|e| eyre!("Vault {} has an invalid address: {}", self.address, e))?;
        let tvl = self.tvl();

        Ok(Vault {
            address,
            name: self.name,
            symbol: self.symbol,
            decimals: self.decimals,
            pool: Pool {
                address: self.pool.address,
                token0: self.pool.token0.into(),
                token1: self.pool.token1.into(),
                fee: self.pool.fee,
                tick_spacing: self.pool.tick_spacing,
                current_tick: self.pool.current_tick,
                sqrt_price_x96: self.pool.sqrt_price_x96,
                price0: self.pool.price0,
                price1: self.pool.price1,
            },
            total_supply: self.total_supply,
            lower_tick: self.lower_tick,
            upper_tick: self.upper_tick,
            is_active: self.is_active,
            tvl,
            position: self.position,
        })
    }
}

// ============================================
// API CLIENT
// ============================================

pub struct ApiClient {
    http_client: Client,
    base_url: String,
    log_requests: bool,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.api_timeout())
            .build()
            .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            log_requests: config.enable_api_logging,
        })
    }

    /// Raw backend listing
    pub async fn get_all_vaults(&self) -> Result<Vec<BackendVault>> {
        let url = format!("{}/vaults", self.base_url);
        if self.log_requests {
            info!("Making GET request to {}", url);
        } else {
            debug!("GET {}", url);
        }

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            if self.log_requests {
                warn!("API error for {}: {}", url, e);
            }
            eyre!("Vault listing request failed: {}", e)
        })?;

        let status = response.status();
        if self.log_requests {
            info!("Response from {}: {}", url, status);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("Vault listing returned HTTP {}: {}", status, body));
        }

        let vaults: Vec<BackendVault> = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to decode vault listing: {}", e))?;

        Ok(vaults)
    }

    /// Listing transformed into vault snapshots; malformed entries are skipped
    pub async fn list_vaults(&self) -> Result<Vec<Vault>> {
        let backend = self.get_all_vaults().await?;
        let total = backend.len();

        let vaults: Vec<Vault> = backend
            .into_iter()
            .filter_map(|v| match v.into_vault() {
                Ok(vault) => Some(vault),
                Err(e) => {
                    warn!("Skipping vault: {}", e);
                    None
                }
            })
            .collect();

        debug!("Loaded {}/{} vaults", vaults.len(), total);
        Ok(vaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"[
      {
        "address": "0x00000000000000000000000000000000005a1b2c",
        "pool": {
          "address": "0x0000000000000000000000000000000000388a2b",
          "token0": {"address": "0x000000000000000000000000000000000006f89a", "name": "USD Coin", "symbol": "USDC", "decimals": 6, "is_native_wrapper": false},
          "token1": {"address": "0x0000000000000000000000000000000000163b5a", "name": "Wrapped Hbar", "symbol": "WHBAR", "decimals": 8, "is_native_wrapper": true},
          "fee": 1500,
          "tick_spacing": 30,
          "current_tick": -120,
          "sqrt_price_x96": "79228162514264337593543950336",
          "price1": 0.2,
          "price0": 5.0
        },
        "name": "Mani Vault",
        "symbol": "MVLT",
        "decimals": 18,
        "total_supply": 1000.5,
        "lower_tick": -600,
        "upper_tick": 600,
        "is_active": true,
        "tvl": {"tvl0": 1200.0, "tvl1": 3400.0}
      },
      {
        "address": "0x00000000000000000000000000000000005a1b2d",
        "pool": {
          "address": "0x0000000000000000000000000000000000388a2c",
          "token0": {"address": "0x0000000000000000000000000000000000120f46", "name": "Sauce", "symbol": "SAUCE", "decimals": 6, "is_native_wrapper": false},
          "token1": {"address": "0x000000000000000000000000000000000006f89a", "name": "USD Coin", "symbol": "USDC", "decimals": 6, "is_native_wrapper": false},
          "fee": 3000
        },
        "name": "Mani Vault 2",
        "symbol": "MVLT2",
        "total_supply": 0,
        "is_active": false,
        "tvl0": 10.0,
        "tvl1": 20.0
      },
      {
        "address": "0x00000000000000000000000000000000005a1b2e",
        "pool": {
          "address": "0x0000000000000000000000000000000000388a2d",
          "token0": {"address": "0x0000000000000000000000000000000000120f46", "name": "Sauce", "symbol": "SAUCE", "decimals": 6},
          "token1": {"address": "0x000000000000000000000000000000000006f89a", "name": "USD Coin", "symbol": "USDC", "decimals": 6},
          "fee": 3000
        },
        "name": "Mani Vault 3",
        "symbol": "MVLT3",
        "tvl": "$2.4M"
      }
    ]"#;

    #[test]
    fn test_decode_listing_variants() {
        let backend: Vec<BackendVault> = serde_json::from_str(LISTING).unwrap();
        assert_eq!(backend.len(), 3);

        let vaults: Vec<Vault> = backend
            .into_iter()
            .map(|v| v.into_vault().unwrap())
            .collect();

        assert_eq!(vaults[0].tvl, Some(Tvl { tvl0: 1200.0, tvl1: 3400.0 }));
        assert!(vaults[0].pool.token1.is_native_wrapper);
        assert_eq!(vaults[0].pair_label(), "USDC/HBAR");

        // flat tvl0/tvl1 fallback, default share decimals
        assert_eq!(vaults[1].tvl, Some(Tvl { tvl0: 10.0, tvl1: 20.0 }));
        assert_eq!(vaults[1].decimals, 18);
        assert!(!vaults[1].is_active);

        // string TVL carries no split
        assert_eq!(vaults[2].tvl, None);
        assert!(!vaults[2].pool.token0.is_native_wrapper);
    }

    #[test]
    fn test_invalid_vault_address_is_an_error() {
        let mut backend: Vec<BackendVault> = serde_json::from_str(LISTING).unwrap();
        let mut bad = backend.remove(0);
        bad.address = "0.0.12345".to_string();
        assert!(bad.into_vault().is_err());
    }
}
