//! Token definitions for vaultkeeper
//!
//! Covers:
//! - Token descriptors as served by the vault backend
//! - Hedera-native token identifiers (`shard.realm.num`) and their
//!   long-zero EVM aliases
//! - Placeholder addresses that stand for native HBAR
//! - Known token ids per network (testnet / mainnet)

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::Network;

// ============================================
// TOKEN DESCRIPTOR
// ============================================

/// One side of a vault's pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    /// EVM address (`0x…`) or, for some backends, a Hedera id (`0.0.x`)
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    /// Marks the chain's native-currency wrapper (WHBAR); moves as native value
    pub is_native_wrapper: bool,
}

impl TokenDescriptor {
    /// Symbol shown to the user. The native wrapper is presented as the
    /// native currency itself.
    pub fn display_symbol(&self) -> &str {
        if self.is_native_wrapper {
            NATIVE_SYMBOL
        } else {
            &self.symbol
        }
    }

    pub fn display_name(&self) -> &str {
        if self.is_native_wrapper {
            NATIVE_NAME
        } else {
            &self.name
        }
    }

    /// True when no approval is ever needed for this token
    pub fn is_native(&self) -> bool {
        self.is_native_wrapper || is_native_placeholder(&self.address)
    }

    /// EVM address usable for contract reads, whichever form the backend sent
    pub fn evm_address(&self) -> Option<Address> {
        if let Ok(id) = self.address.parse::<TokenId>() {
            return Some(id.to_evm_address());
        }
        Address::from_str(&self.address).ok()
    }
}

// ============================================
// NATIVE CURRENCY
// ============================================

pub const NATIVE_SYMBOL: &str = "HBAR";
pub const NATIVE_NAME: &str = "Hedera Hashgraph";

/// Addresses that stand in for native HBAR instead of a real token
pub const NATIVE_PLACEHOLDERS: [&str; 2] = [
    "0x0000000000000000000000000000000000000000",
    "0x0000000000000000000000000000000000003ad2",
];

/// Hedera Token Service system contract
pub const HTS_PRECOMPILE: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x67,
]);

pub fn is_native_placeholder(address: &str) -> bool {
    let lower = address.trim().to_lowercase();
    lower.is_empty() || NATIVE_PLACEHOLDERS.contains(&lower.as_str())
}

// ============================================
// HEDERA TOKEN ID
// ============================================

/// `shard.realm.num` identifier for a Hedera entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId {
    pub shard: u32,
    pub realm: u64,
    pub num: u64,
}

impl TokenId {
    /// Reserved id used for native HBAR
    pub const NATIVE: TokenId = TokenId { shard: 0, realm: 0, num: 0 };

    pub const fn new(num: u64) -> Self {
        Self { shard: 0, realm: 0, num }
    }

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Long-zero EVM alias: 4 bytes shard, 8 bytes realm, 8 bytes num
    pub fn to_evm_address(&self) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0..4].copy_from_slice(&self.shard.to_be_bytes());
        bytes[4..12].copy_from_slice(&self.realm.to_be_bytes());
        bytes[12..20].copy_from_slice(&self.num.to_be_bytes());
        Address::from(bytes)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a Hedera entity id: \"{0}\"")]
pub struct ParseTokenIdError(String);

impl FromStr for TokenId {
    type Err = ParseTokenIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTokenIdError(s.to_string());
        let mut parts = s.trim().split('.');

        let (Some(shard), Some(realm), Some(num), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(err());
        };

        let digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
        if !digits(shard) || !digits(realm) || !digits(num) {
            return Err(err());
        }

        Ok(TokenId {
            shard: shard.parse().map_err(|_| err())?,
            realm: realm.parse().map_err(|_| err())?,
            num: num.parse().map_err(|_| err())?,
        })
    }
}

// ============================================
// KNOWN TOKENS (per network)
// ============================================

lazy_static::lazy_static! {
    static ref TESTNET_TOKENS: HashMap<&'static str, TokenId> = {
        let mut m = HashMap::new();
        m.insert("0x0000000000000000000000000000000000001549", TokenId::new(5449)); // USDC
        m.insert("0x0000000000000000000000000000000000001599", TokenId::new(5529)); // DAI
        m.insert("0x0000000000000000000000000000000000120f46", TokenId::new(1183558)); // SAUCE
        m
    };

    static ref MAINNET_TOKENS: HashMap<&'static str, TokenId> = {
        let mut m = HashMap::new();
        m.insert("0x0000000000000000000000000000000000120f46", TokenId::new(731861)); // SAUCE
        m.insert("0x000000000000000000000000000000000006f89a", TokenId::new(456858)); // USDC
        m
    };
}

/// Static lookup by lowercase EVM address
pub fn known_token_id(network: Network, address: &str) -> Option<TokenId> {
    let table = match network {
        Network::Testnet => &*TESTNET_TOKENS,
        Network::Mainnet => &*MAINNET_TOKENS,
    };
    table.get(address.trim().to_lowercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(address: &str, native: bool) -> TokenDescriptor {
        TokenDescriptor {
            address: address.to_string(),
            symbol: "WHBAR".to_string(),
            name: "Wrapped Hbar".to_string(),
            decimals: 8,
            is_native_wrapper: native,
        }
    }

    #[test]
    fn test_token_id_roundtrip_display() {
        let id: TokenId = "0.0.456858".parse().unwrap();
        assert_eq!(id, TokenId::new(456858));
        assert_eq!(id.to_string(), "0.0.456858");
        assert!(TokenId::NATIVE.is_native());
    }

    #[test]
    fn test_token_id_rejects_evm_addresses() {
        assert!("0x000000000000000000000000000000000006f89a".parse::<TokenId>().is_err());
        assert!("0.0".parse::<TokenId>().is_err());
        assert!("0.0.x".parse::<TokenId>().is_err());
        assert!("0.0.1.2".parse::<TokenId>().is_err());
    }

    #[test]
    fn test_long_zero_address() {
        let usdc = TokenId::new(456858);
        assert_eq!(
            usdc.to_evm_address(),
            Address::from_str("0x000000000000000000000000000000000006f89a").unwrap()
        );
        assert_eq!(
            TokenId::new(0x167).to_evm_address(),
            HTS_PRECOMPILE
        );
    }

    #[test]
    fn test_native_detection() {
        assert!(descriptor("0x1234567890123456789012345678901234567890", true).is_native());
        assert!(descriptor("0x0000000000000000000000000000000000003aD2", false).is_native());
        assert!(descriptor("", false).is_native());
        assert!(!descriptor("0x000000000000000000000000000000000006f89a", false).is_native());
    }

    #[test]
    fn test_display_symbol_for_wrapper() {
        assert_eq!(descriptor("0x01", true).display_symbol(), "HBAR");
        assert_eq!(descriptor("0x01", false).display_symbol(), "WHBAR");
    }

    #[test]
    fn test_known_tokens_are_network_specific() {
        let sauce = "0x0000000000000000000000000000000000120F46";
        assert_eq!(known_token_id(Network::Mainnet, sauce), Some(TokenId::new(731861)));
        assert_eq!(known_token_id(Network::Testnet, sauce), Some(TokenId::new(1183558)));
        assert_eq!(
            known_token_id(Network::Testnet, "0x000000000000000000000000000000000006f89a"),
            None
        );
    }

    #[test]
    fn test_evm_address_from_either_form() {
        let mut d = descriptor("0.0.456858", false);
        assert_eq!(d.evm_address(), Some(TokenId::new(456858).to_evm_address()));
        d.address = "0x000000000000000000000000000000000006f89a".to_string();
        assert_eq!(d.evm_address(), Some(TokenId::new(456858).to_evm_address()));
        d.address = "nonsense".to_string();
        assert_eq!(d.evm_address(), None);
    }
}
