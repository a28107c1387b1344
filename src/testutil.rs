//! In-memory wallet and chain reader for tests

use alloy_primitives::{Address, TxHash, B256, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::chain::{ChainReader, ContractCall, VaultInfo, Wallet, WalletError};

pub const TEST_ACCOUNT: Address = Address::new([0x11; 20]);

/// Records every call. Send results and receipt statuses are scripted in
/// order; once a script runs out every send succeeds and every receipt is ok.
pub struct FakeWallet {
    pub chain_id: u64,
    pub sent: Mutex<Vec<ContractCall>>,
    send_script: Mutex<VecDeque<Result<(), WalletError>>>,
    receipt_script: Mutex<VecDeque<bool>>,
    release: Option<Arc<Notify>>,
}

impl FakeWallet {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            sent: Mutex::new(Vec::new()),
            send_script: Mutex::new(VecDeque::new()),
            receipt_script: Mutex::new(VecDeque::new()),
            release: None,
        }
    }

    /// Every send parks after being recorded until `release` is notified
    pub fn held_until(mut self, release: Arc<Notify>) -> Self {
        self.release = Some(release);
        self
    }

    pub fn then_send(self, result: Result<(), WalletError>) -> Self {
        self.send_script.lock().unwrap().push_back(result);
        self
    }

    pub fn then_receipt(self, status: bool) -> Self {
        self.receipt_script.lock().unwrap().push_back(status);
        self
    }

    pub fn sent(&self) -> Vec<ContractCall> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Wallet for FakeWallet {
    fn address(&self) -> Address {
        TEST_ACCOUNT
    }

    async fn ensure_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        if chain_id == self.chain_id {
            Ok(())
        } else {
            Err(WalletError::new(Some(4901), format!("wallet on chain {}", self.chain_id)))
        }
    }

    async fn send_transaction(&self, call: ContractCall) -> Result<TxHash, WalletError> {
        let n = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(call);
            sent.len()
        };

        if let Some(release) = &self.release {
            release.notified().await;
        }

        let scripted = self.send_script.lock().unwrap().pop_front();
        if let Some(Err(e)) = scripted {
            return Err(e);
        }
        Ok(B256::with_last_byte(n as u8))
    }

    async fn wait_for_receipt(&self, _tx_hash: TxHash) -> Result<bool, WalletError> {
        Ok(self.receipt_script.lock().unwrap().pop_front().unwrap_or(true))
    }
}

#[derive(Default)]
pub struct FakeReader {
    pub shares: U256,
    pub supply: U256,
    pub totals: (U256, U256),
    pub token_balances: HashMap<Address, U256>,
    pub native: U256,
    /// When set every read fails with this message
    pub failure: Option<String>,
}

impl FakeReader {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(eyre!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChainReader for FakeReader {
    async fn share_balance(&self, _vault: Address, _account: Address) -> Result<U256> {
        self.check()?;
        Ok(self.shares)
    }

    async fn total_supply(&self, _vault: Address) -> Result<U256> {
        self.check()?;
        Ok(self.supply)
    }

    async fn total_amounts(&self, _vault: Address) -> Result<(U256, U256)> {
        self.check()?;
        Ok(self.totals)
    }

    async fn vault_info(&self, _vault: Address) -> Result<VaultInfo> {
        self.check()?;
        Ok(VaultInfo {
            name: "Mani Vault".to_string(),
            symbol: "MVLT".to_string(),
            lower_tick: -600,
            upper_tick: 600,
            is_active: true,
        })
    }

    async fn token_balance(&self, token: Address, _owner: Address) -> Result<U256> {
        self.check()?;
        self.token_balances
            .get(&token)
            .copied()
            .ok_or_else(|| eyre!("balanceOf reverted on {:?}", token))
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256> {
        self.check()?;
        Ok(self.native)
    }
}
