//! Token Resolver
//!
//! Maps a pool token to the Hedera token id used for approvals.
//!
//! Resolution order:
//! 1. Native wrapper or placeholder address → `0.0.0`, no lookups
//! 2. Previously resolved (per-address cache)
//! 3. Static per-network table
//! 4. Address already in `shard.realm.num` form
//! 5. Mirror node, by holder address, symbol must match
//! 6. Mirror node, by token address, symbol must match
//!
//! Step 6 checks the symbol too, even though the mirror node only returns
//! the token with that exact id. A mismatched symbol means the pool data and
//! the network disagree, and approving the wrong token is worse than failing.
//!
//! Anything else is a [`TokenResolutionError`].

mod mirror_node;

pub use mirror_node::{IndexedToken, MirrorNodeClient, TokenIndex};

#[cfg(test)]
pub use mirror_node::MockTokenIndex;

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Network;
use crate::tokens::{known_token_id, TokenDescriptor, TokenId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to find a Hedera token id for {symbol} ({address})")]
pub struct TokenResolutionError {
    pub symbol: String,
    pub address: String,
}

pub struct TokenResolver {
    network: Network,
    index: Arc<dyn TokenIndex>,
    cache: RwLock<HashMap<String, TokenId>>,
}

impl TokenResolver {
    pub fn new(network: Network, index: Arc<dyn TokenIndex>) -> Self {
        Self {
            network,
            index,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub async fn resolve(
        &self,
        token: &TokenDescriptor,
        symbol: &str,
    ) -> Result<TokenId, TokenResolutionError> {
        if token.is_native() {
            debug!("{} is native HBAR, using {}", symbol, TokenId::NATIVE);
            return Ok(TokenId::NATIVE);
        }

        let key = token.address.trim().to_lowercase();

        if let Some(id) = self.cache.read().await.get(&key) {
            return Ok(*id);
        }

        let id = self.lookup(&key, symbol).await.ok_or_else(|| TokenResolutionError {
            symbol: symbol.to_string(),
            address: token.address.clone(),
        })?;

        self.cache.write().await.insert(key, id);
        Ok(id)
    }

    async fn lookup(&self, address: &str, symbol: &str) -> Option<TokenId> {
        if let Some(id) = known_token_id(self.network, address) {
            debug!("{} → {} (known {} token)", symbol, id, self.network);
            return Some(id);
        }

        if let Ok(id) = address.parse::<TokenId>() {
            return Some(id);
        }

        match self.index.tokens_by_account(address).await {
            Ok(tokens) => {
                if let Some(id) = matching(&tokens, symbol) {
                    info!("Found token id {} for {} via account query", id, symbol);
                    return Some(id);
                }
            }
            Err(e) => warn!("Mirror node account query for {} failed: {}", address, e),
        }

        match self.index.tokens_by_id(address).await {
            Ok(tokens) => {
                if let Some(id) = matching(&tokens, symbol) {
                    info!("Found token id {} for {} via token query", id, symbol);
                    return Some(id);
                }
            }
            Err(e) => warn!("Mirror node token query for {} failed: {}", address, e),
        }

        None
    }
}

fn matching(tokens: &[IndexedToken], symbol: &str) -> Option<TokenId> {
    tokens
        .iter()
        .filter(|t| t.symbol == symbol)
        .find_map(|t| t.token_id.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::eyre;

    fn token(address: &str, symbol: &str, native: bool) -> TokenDescriptor {
        TokenDescriptor {
            address: address.to_string(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            decimals: 6,
            is_native_wrapper: native,
        }
    }

    fn indexed(id: &str, symbol: &str) -> IndexedToken {
        IndexedToken {
            token_id: id.to_string(),
            symbol: symbol.to_string(),
        }
    }

    /// Index that fails the test if touched
    fn untouched_index() -> Arc<dyn TokenIndex> {
        let mut index = MockTokenIndex::new();
        index.expect_tokens_by_account().never();
        index.expect_tokens_by_id().never();
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_native_needs_no_lookup() {
        let resolver = TokenResolver::new(Network::Mainnet, untouched_index());

        let wrapper = token("0x0000000000000000000000000000000000163b5a", "WHBAR", true);
        assert_eq!(resolver.resolve(&wrapper, "HBAR").await.unwrap(), TokenId::NATIVE);

        let placeholder = token("0x0000000000000000000000000000000000003AD2", "HBAR", false);
        assert_eq!(resolver.resolve(&placeholder, "HBAR").await.unwrap(), TokenId::NATIVE);
    }

    #[tokio::test]
    async fn test_static_table_is_case_insensitive() {
        let resolver = TokenResolver::new(Network::Mainnet, untouched_index());
        let usdc = token("0x000000000000000000000000000000000006F89A", "USDC", false);
        assert_eq!(resolver.resolve(&usdc, "USDC").await.unwrap(), TokenId::new(456858));
    }

    #[tokio::test]
    async fn test_hedera_id_passthrough() {
        let resolver = TokenResolver::new(Network::Testnet, untouched_index());
        let t = token("0.0.98765", "XYZ", false);
        assert_eq!(resolver.resolve(&t, "XYZ").await.unwrap(), TokenId::new(98765));
    }

    #[tokio::test]
    async fn test_account_query_then_cached() {
        let mut index = MockTokenIndex::new();
        index
            .expect_tokens_by_account()
            .times(1)
            .returning(|_| Ok(vec![indexed("0.0.1111", "OTHER"), indexed("0.0.2222", "PACK")]));
        index.expect_tokens_by_id().never();

        let resolver = TokenResolver::new(Network::Testnet, Arc::new(index));
        let t = token("0x00000000000000000000000000000000000008ae", "PACK", false);

        let first = resolver.resolve(&t, "PACK").await.unwrap();
        let second = resolver.resolve(&t, "PACK").await.unwrap();
        assert_eq!(first, TokenId::new(2222));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_falls_back_to_token_query() {
        let mut index = MockTokenIndex::new();
        index
            .expect_tokens_by_account()
            .times(1)
            .returning(|_| Err(eyre!("503")));
        index
            .expect_tokens_by_id()
            .times(1)
            .returning(|_| Ok(vec![indexed("0.0.3333", "PACK")]));

        let resolver = TokenResolver::new(Network::Testnet, Arc::new(index));
        let t = token("0x0000000000000000000000000000000000000d05", "PACK", false);
        assert_eq!(resolver.resolve(&t, "PACK").await.unwrap(), TokenId::new(3333));
    }

    #[tokio::test]
    async fn test_exhausted_is_resolution_error() {
        let mut index = MockTokenIndex::new();
        index
            .expect_tokens_by_account()
            .times(1)
            .returning(|_| Ok(vec![indexed("0.0.1111", "OTHER")]));
        index
            .expect_tokens_by_id()
            .times(1)
            .returning(|_| Ok(vec![indexed("0.0.4444", "NOPE")]));

        let resolver = TokenResolver::new(Network::Testnet, Arc::new(index));
        let t = token("0x0000000000000000000000000000000000000abc", "PACK", false);

        let err = resolver.resolve(&t, "PACK").await.unwrap_err();
        assert_eq!(err.symbol, "PACK");
        assert_eq!(err.address, "0x0000000000000000000000000000000000000abc");
    }
}
