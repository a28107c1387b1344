//! Hedera mirror node token index
//!
//! API: {mirror}/api/v1/tokens?account.id=<evm address>
//!      {mirror}/api/v1/tokens?token.id=<evm address>

use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::Config;

/// Mirror node calls are small; keep them snappy
const MIRROR_TIMEOUT_SECS: u64 = 10;

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexedToken {
    pub token_id: String,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
struct TokensResponse {
    #[serde(default)]
    tokens: Vec<IndexedToken>,
}

// ============================================
// INDEX
// ============================================

/// Read-only block-explorer style token index
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenIndex: Send + Sync {
    /// Tokens associated with the account at `address`
    async fn tokens_by_account(&self, address: &str) -> Result<Vec<IndexedToken>>;

    /// Tokens whose id matches `address`
    async fn tokens_by_id(&self, address: &str) -> Result<Vec<IndexedToken>>;
}

pub struct MirrorNodeClient {
    http_client: Client,
    api_url: String,
}

impl MirrorNodeClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(MIRROR_TIMEOUT_SECS))
            .build()
            .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.mirror_api_url())
    }

    async fn query(&self, filter: &str, address: &str) -> Result<Vec<IndexedToken>> {
        let url = format!("{}/tokens", self.api_url);
        debug!("GET {}?{}={}", url, filter, address);

        let response = self
            .http_client
            .get(&url)
            .query(&[(filter, address)])
            .send()
            .await
            .map_err(|e| eyre!("Mirror node request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(eyre!("Mirror node returned HTTP {}", response.status()));
        }

        let body: TokensResponse = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to decode mirror node response: {}", e))?;

        trace!("{} tokens for {}={}", body.tokens.len(), filter, address);
        Ok(body.tokens)
    }
}

#[async_trait]
impl TokenIndex for MirrorNodeClient {
    async fn tokens_by_account(&self, address: &str) -> Result<Vec<IndexedToken>> {
        self.query("account.id", address).await
    }

    async fn tokens_by_id(&self, address: &str) -> Result<Vec<IndexedToken>> {
        self.query("token.id", address).await
    }
}
