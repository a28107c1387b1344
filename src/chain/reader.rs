//! JSON-RPC backed contract reads

use alloy_primitives::{Address, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::trace;

use super::{ChainReader, IVault, VaultInfo, IERC20};

pub struct RpcChainReader {
    provider: DynProvider,
}

impl RpcChainReader {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = ProviderBuilder::new().connect_http(rpc_url.parse()?).erased();
        Ok(Self { provider })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let tx = TransactionRequest::default()
            .to(to)
            .input(call.abi_encode().into());

        let result = self
            .provider
            .call(tx)
            .await
            .map_err(|e| eyre!("{} on {:?} failed: {}", C::SIGNATURE, to, e))?;

        trace!("{} on {:?} -> {} bytes", C::SIGNATURE, to, result.len());

        C::abi_decode_returns(&result)
            .map_err(|e| eyre!("Failed to decode {} from {:?}: {}", C::SIGNATURE, to, e))
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn share_balance(&self, vault: Address, account: Address) -> Result<U256> {
        self.call(vault, IVault::balanceOfCall { account }).await
    }

    async fn total_supply(&self, vault: Address) -> Result<U256> {
        self.call(vault, IVault::totalSupplyCall {}).await
    }

    async fn total_amounts(&self, vault: Address) -> Result<(U256, U256)> {
        let amounts = self.call(vault, IVault::getTotalAmountsCall {}).await?;
        Ok((amounts.total0, amounts.total1))
    }

    async fn vault_info(&self, vault: Address) -> Result<VaultInfo> {
        let (name, symbol, lower, upper, is_active) = tokio::try_join!(
            self.call(vault, IVault::nameCall {}),
            self.call(vault, IVault::symbolCall {}),
            self.call(vault, IVault::lowerTickCall {}),
            self.call(vault, IVault::upperTickCall {}),
            self.call(vault, IVault::isActiveCall {}),
        )?;

        Ok(VaultInfo {
            name,
            symbol,
            lower_tick: i32::try_from(lower).map_err(|_| eyre!("lowerTick out of range"))?,
            upper_tick: i32::try_from(upper).map_err(|_| eyre!("upperTick out of range"))?,
            is_active,
        })
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        self.call(token, IERC20::balanceOfCall { owner }).await
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        self.provider
            .get_balance(owner)
            .await
            .map_err(|e| eyre!("Native balance of {:?} failed: {}", owner, e))
    }
}
