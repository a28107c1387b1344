//! Wallet - transaction signing and submission
//!
//! The wallet owns the user's account. It is the only component that signs,
//! and the only place a user can refuse a transaction.
//!
//! ⚠️  SECURITY WARNING:
//! - Never log or expose private keys
//! - Use environment variables, not hardcoded keys

use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::config::Config;

/// EIP-1193 "User Rejected Request"
pub const USER_REJECTED_CODE: i64 = 4001;

/// EIP-1193 "Chain Disconnected"
const CHAIN_MISMATCH_CODE: i64 = 4901;

// ============================================
// TYPES
// ============================================

/// A contract call waiting to be signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    /// Human readable summary shown when asking the user to sign
    pub description: String,
}

/// Error reported by a wallet backend, shaped like an EIP-1193 provider error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WalletError {
    pub code: Option<i64>,
    pub message: String,
}

impl WalletError {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn rejected() -> Self {
        Self::new(Some(USER_REJECTED_CODE), "User rejected the request.")
    }
}

impl From<TransportError> for WalletError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => WalletError::new(Some(payload.code), payload.message.to_string()),
            None => WalletError::new(None, err.to_string()),
        }
    }
}

#[async_trait]
pub trait Wallet: Send + Sync {
    /// Account that signs and receives
    fn address(&self) -> Address;

    /// Make sure the wallet is talking to `chain_id`
    async fn ensure_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Sign and broadcast; returns as soon as the transaction is accepted
    async fn send_transaction(&self, call: ContractCall) -> Result<TxHash, WalletError>;

    /// Block until the transaction is mined. `true` when it succeeded.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<bool, WalletError>;
}

/// Asked before every signature; returning `false` rejects the transaction
pub type ConfirmFn = Arc<dyn Fn(&ContractCall) -> bool + Send + Sync>;

// ============================================
// LOCAL SIGNER WALLET
// ============================================

/// Wallet backed by a local private key and a JSON-RPC relay
pub struct SignerWallet {
    address: Address,
    provider: DynProvider,
    poll_interval: Duration,
    confirm: Option<ConfirmFn>,
}

impl SignerWallet {
    pub fn new(private_key: &str, rpc_url: &str, poll_interval: Duration) -> Result<Self> {
        let key = private_key.trim().trim_start_matches("0x");
        let signer = PrivateKeySigner::from_str(key)
            .map_err(|e| eyre!("Failed to parse wallet private key: {}", e))?;
        let address = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(rpc_url.parse()?)
            .erased();

        info!("✓ Wallet loaded: {:?}", address);

        Ok(Self {
            address,
            provider,
            poll_interval,
            confirm: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config
            .wallet_private_key
            .as_deref()
            .ok_or_else(|| eyre!("WALLET_PRIVATE_KEY is required to sign transactions"))?;
        Self::new(key, &config.effective_rpc_url(), config.receipt_poll_interval())
    }

    pub fn with_confirmation(mut self, confirm: ConfirmFn) -> Self {
        self.confirm = Some(confirm);
        self
    }

    async fn user_approves(&self, call: &ContractCall) -> bool {
        let Some(confirm) = self.confirm.clone() else {
            return true;
        };
        let call = call.clone();
        tokio::task::spawn_blocking(move || confirm(&call))
            .await
            .unwrap_or(false)
    }
}

#[async_trait]
impl Wallet for SignerWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn ensure_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let connected = self.provider.get_chain_id().await?;
        if connected != chain_id {
            return Err(WalletError::new(
                Some(CHAIN_MISMATCH_CODE),
                format!("RPC relay is on chain {}, expected {}", connected, chain_id),
            ));
        }
        Ok(())
    }

    async fn send_transaction(&self, call: ContractCall) -> Result<TxHash, WalletError> {
        if !self.user_approves(&call).await {
            debug!("User declined: {}", call.description);
            return Err(WalletError::rejected());
        }

        let tx = TransactionRequest::default()
            .from(self.address)
            .to(call.to)
            .value(call.value)
            .gas_limit(call.gas_limit)
            .input(call.data.into());

        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();

        debug!("Sent {} as {:?}", call.description, tx_hash);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<bool, WalletError> {
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
                let status = receipt.status();
                debug!("Receipt for {:?}: status={}", tx_hash, status);
                return Ok(status);
            }
            trace!("No receipt yet for {:?}", tx_hash);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
