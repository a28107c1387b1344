//! Transaction Orchestrator
//!
//! Drives deposits and withdrawals against one vault:
//! - Validates amounts before touching the wallet
//! - Resolves and approves each non-native token leg
//! - Submits the vault call and waits for its receipt
//! - Reports progress through a [`StageMachine`]
//!
//! ⚠️  WARNING: This module moves real funds!
//! Always try a new vault on testnet first.

mod approval;
mod stage;

pub use approval::{default_strategies, ApprovalStrategy, Erc20Approval, PrecompileApproval};
pub use stage::{InvalidTransition, StageMachine, StageObserver, TransactionStage};

use alloy_primitives::{Address, TxHash, U256};
use alloy_sol_types::SolCall;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::chain::{
    ChainReader, ContractCall, Eip1193Classifier, IVault, Wallet, WalletError, WalletErrorClassifier,
};
use crate::config::Config;
use crate::position::{PositionCalculator, UserPosition};
use crate::resolver::{TokenResolutionError, TokenResolver};
use crate::tokens::{TokenDescriptor, TokenId};
use crate::units::{format_units, parse_units, UnitsError, NATIVE_DECIMALS};
use crate::vault::Vault;

// ============================================
// ERRORS
// ============================================

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    TokenResolution(#[from] TokenResolutionError),

    #[error("failed to approve {symbol}: {reason}")]
    Approval { symbol: String, reason: String },

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("transaction cancelled by user")]
    UserCancelled,

    #[error("wallet error: {0}")]
    Provider(String),

    #[error(transparent)]
    InvalidStage(#[from] InvalidTransition),
}

impl From<UnitsError> for ExecutorError {
    fn from(err: UnitsError) -> Self {
        ExecutorError::Validation(err.to_string())
    }
}

impl ExecutorError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ExecutorError::UserCancelled)
    }
}

// ============================================
// SETTINGS
// ============================================

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub chain_id: u64,
    pub approval_gas_limit: u64,
    pub vault_gas_limit: u64,
    /// Wait before re-reading the position after a withdrawal
    pub settlement_delay: Duration,
}

impl ExecutorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chain_id: config.chain_id(),
            approval_gas_limit: config.approval_gas_limit,
            vault_gas_limit: config.vault_gas_limit,
            settlement_delay: config.settlement_delay(),
        }
    }
}

// ============================================
// EXECUTOR
// ============================================

pub struct VaultExecutor {
    vault: Vault,
    wallet: Arc<dyn Wallet>,
    reader: Arc<dyn ChainReader>,
    resolver: Arc<TokenResolver>,
    strategies: Vec<Box<dyn ApprovalStrategy>>,
    classifier: Box<dyn WalletErrorClassifier>,
    stage: StageMachine,
    calculator: Arc<PositionCalculator>,
    position: Arc<RwLock<Option<UserPosition>>>,
    in_flight: Mutex<()>,
    refresh: Mutex<Option<JoinHandle<()>>>,
    settings: ExecutorSettings,
}

impl VaultExecutor {
    pub fn new(
        vault: Vault,
        wallet: Arc<dyn Wallet>,
        reader: Arc<dyn ChainReader>,
        resolver: Arc<TokenResolver>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            vault,
            wallet,
            calculator: Arc::new(PositionCalculator::new(reader.clone())),
            reader,
            resolver,
            strategies: default_strategies(),
            classifier: Box::new(Eip1193Classifier),
            stage: StageMachine::new(),
            position: Arc::new(RwLock::new(None)),
            in_flight: Mutex::new(()),
            refresh: Mutex::new(None),
            settings,
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<Box<dyn ApprovalStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn WalletErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_stage_observer(mut self, observer: StageObserver) -> Self {
        self.stage = self.stage.with_observer(observer);
        self
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn stage(&self) -> &StageMachine {
        &self.stage
    }

    /// Last loaded position, if any
    pub async fn position(&self) -> Option<UserPosition> {
        self.position.read().await.clone()
    }

    /// Read the connected account's position and keep it for withdrawals
    pub async fn load_position(&self) -> Option<UserPosition> {
        let position = self.calculator.fetch(self.wallet.address(), &self.vault).await;
        *self.position.write().await = position.clone();
        position
    }

    /// Wait for the post-withdrawal position refresh, if one is pending
    pub async fn wait_for_refresh(&self) {
        let handle = self.refresh.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Position refresh task failed: {}", e);
            }
        }
    }

    // ============================================
    // DEPOSIT
    // ============================================

    /// Deposit decimal `amount0` / `amount1` of the pool tokens. One leg may be
    /// zero, not both.
    pub async fn deposit(&self, amount0: &str, amount1: &str) -> Result<TxHash, ExecutorError> {
        let _guard = self.begin()?;
        let result = self.run_deposit(amount0, amount1).await;
        self.finish("Deposit", result)
    }

    async fn run_deposit(&self, amount0: &str, amount1: &str) -> Result<TxHash, ExecutorError> {
        let token0 = &self.vault.pool.token0;
        let token1 = &self.vault.pool.token1;

        let raw0 = parse_units(amount0, token0.decimals)?;
        let raw1 = parse_units(amount1, token1.decimals)?;

        if raw0.is_zero() && raw1.is_zero() {
            return Err(ExecutorError::Validation(
                "Please enter an amount for at least one token".to_string(),
            ));
        }

        let account = self.wallet.address();
        self.ensure_chain().await?;

        for (token, raw) in [(token0, raw0), (token1, raw1)] {
            if raw.is_zero() {
                continue;
            }
            if token.is_native() {
                debug!("Skipping approval: {} is native", token.display_symbol());
                continue;
            }

            let symbol = token.display_symbol();
            let token_id = self.resolver.resolve(token, symbol).await?;
            self.check_balance(token, token_id, account, raw).await;

            self.stage.transition(TransactionStage::Approving)?;
            self.approve(token_id, symbol, raw).await?;
        }

        let value = match self.vault.native_leg() {
            Some(0) if !raw0.is_zero() => parse_units(amount0, NATIVE_DECIMALS)?,
            Some(1) if !raw1.is_zero() => parse_units(amount1, NATIVE_DECIMALS)?,
            _ => U256::ZERO,
        };

        self.stage.transition(TransactionStage::Depositing)?;

        let call = ContractCall {
            to: self.vault.address,
            data: IVault::depositCall {
                deposit0: raw0,
                deposit1: raw1,
                to: account,
            }
            .abi_encode()
            .into(),
            value,
            gas_limit: self.settings.vault_gas_limit,
            description: format!(
                "Deposit {} {} + {} {} into {}",
                format_units(raw0, token0.decimals),
                token0.display_symbol(),
                format_units(raw1, token1.decimals),
                token1.display_symbol(),
                self.vault.name
            ),
        };

        info!("💰 {}", call.description);
        self.submit(call, "Deposit").await
    }

    /// Try each strategy until one is confirmed on chain
    async fn approve(&self, token: TokenId, symbol: &str, amount: U256) -> Result<(), ExecutorError> {
        let mut reason = "no approval strategy configured".to_string();

        for strategy in &self.strategies {
            let call = strategy.build(token, self.vault.address, amount, self.settings.approval_gas_limit);
            info!("🔄 Approving {} (raw {}) via {}", symbol, amount, strategy.name());

            let outcome = match self.wallet.send_transaction(call).await {
                Ok(tx_hash) => self.wallet.wait_for_receipt(tx_hash).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(true) => {
                    info!("✓ {} approved", symbol);
                    return Ok(());
                }
                Ok(false) => {
                    warn!("{} approval of {} reverted", strategy.name(), symbol);
                    reason = format!("{} approval reverted", strategy.name());
                }
                Err(e) if self.classifier.is_user_cancellation(&e) => {
                    return Err(ExecutorError::UserCancelled);
                }
                Err(e) => {
                    warn!("{} approval of {} failed: {}", strategy.name(), symbol, e);
                    reason = e.message;
                }
            }
        }

        Err(ExecutorError::Approval {
            symbol: symbol.to_string(),
            reason,
        })
    }

    /// Shortfalls are reported, not enforced; the approval still goes ahead
    async fn check_balance(&self, token: &TokenDescriptor, token_id: TokenId, owner: Address, needed: U256) {
        match self.reader.token_balance(token_id.to_evm_address(), owner).await {
            Ok(balance) if balance < needed => warn!(
                "⚠️  {} balance {} is below the requested {}",
                token.display_symbol(),
                format_units(balance, token.decimals),
                format_units(needed, token.decimals)
            ),
            Ok(_) => {}
            Err(e) => debug!("Could not read {} balance: {}", token.display_symbol(), e),
        }
    }

    // ============================================
    // WITHDRAW
    // ============================================

    /// Burn `share_amount` (decimal) of the loaded position
    pub async fn withdraw(&self, share_amount: &str) -> Result<TxHash, ExecutorError> {
        let _guard = self.begin()?;
        let result = match self.shares_for_amount(share_amount).await {
            Ok(raw) => self.run_withdraw(raw).await,
            Err(e) => Err(e),
        };
        self.finish("Withdraw", result)
    }

    /// Burn `percent`% of the loaded position, computed on raw shares
    pub async fn withdraw_percent(&self, percent: u8) -> Result<TxHash, ExecutorError> {
        let _guard = self.begin()?;
        let result = match self.shares_for_percent(percent).await {
            Ok(raw) => self.run_withdraw(raw).await,
            Err(e) => Err(e),
        };
        self.finish("Withdraw", result)
    }

    async fn loaded_position(&self) -> Result<UserPosition, ExecutorError> {
        self.position()
            .await
            .ok_or_else(|| ExecutorError::Validation("User position not loaded".to_string()))
    }

    async fn shares_for_amount(&self, share_amount: &str) -> Result<U256, ExecutorError> {
        let position = self.loaded_position().await?;
        let decimals = self.vault.share_decimals();

        let requested = parse_units(share_amount, decimals)?;
        if requested.is_zero() {
            return Err(ExecutorError::Validation("Please enter a valid share amount".to_string()));
        }

        let held = parse_units(&position.share_balance_formatted, decimals)?;
        if requested > held {
            return Err(ExecutorError::Validation(format!(
                "Insufficient share balance: requested {} but only have {}",
                share_amount.trim(),
                position.share_balance_formatted
            )));
        }

        raw_share_amount(position.share_balance, requested, held)
    }

    async fn shares_for_percent(&self, percent: u8) -> Result<U256, ExecutorError> {
        if percent == 0 || percent > 100 {
            return Err(ExecutorError::Validation(format!(
                "Percentage must be between 1 and 100, got {}",
                percent
            )));
        }

        let position = self.loaded_position().await?;
        let raw = position.share_balance * U256::from(percent) / U256::from(100u8);
        if raw.is_zero() {
            return Err(ExecutorError::Validation("No shares to withdraw".to_string()));
        }
        Ok(raw)
    }

    async fn run_withdraw(&self, shares: U256) -> Result<TxHash, ExecutorError> {
        let account = self.wallet.address();
        self.ensure_chain().await?;

        self.stage.transition(TransactionStage::Withdrawing)?;

        let call = ContractCall {
            to: self.vault.address,
            data: IVault::withdrawCall { shares, to: account }.abi_encode().into(),
            value: U256::ZERO,
            gas_limit: self.settings.vault_gas_limit,
            description: format!(
                "Withdraw {} shares from {}",
                format_units(shares, self.vault.share_decimals()),
                self.vault.name
            ),
        };

        info!("💸 {}", call.description);
        let tx_hash = self.submit(call, "Withdraw").await?;
        self.schedule_refresh(account).await;
        Ok(tx_hash)
    }

    // ============================================
    // SHARED STEPS
    // ============================================

    fn begin(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, ExecutorError> {
        let guard = self.in_flight.try_lock().map_err(|_| {
            ExecutorError::Validation("Another transaction is already in progress".to_string())
        })?;
        self.stage.reset();
        Ok(guard)
    }

    fn finish<T>(&self, action: &str, result: Result<T, ExecutorError>) -> Result<T, ExecutorError> {
        match &result {
            Ok(_) => {}
            Err(ExecutorError::UserCancelled) => {
                info!("{} cancelled by user", action);
                self.stage.reset();
            }
            Err(e) => {
                error!("{} failed: {}", action, e);
                self.stage.fail();
            }
        }
        result
    }

    async fn ensure_chain(&self) -> Result<(), ExecutorError> {
        self.wallet
            .ensure_chain(self.settings.chain_id)
            .await
            .map_err(|e| self.wallet_error(e))
    }

    /// Send, wait for the receipt, settle the stage
    async fn submit(&self, call: ContractCall, action: &str) -> Result<TxHash, ExecutorError> {
        let tx_hash = self
            .wallet
            .send_transaction(call)
            .await
            .map_err(|e| self.wallet_error(e))?;

        self.stage.transition(TransactionStage::Confirming)?;
        debug!("Waiting for {:?}", tx_hash);

        let succeeded = self
            .wallet
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|e| self.wallet_error(e))?;

        if !succeeded {
            return Err(ExecutorError::Transaction(format!(
                "{} transaction {:?} reverted",
                action, tx_hash
            )));
        }

        self.stage.transition(TransactionStage::Success)?;
        info!("✅ {} confirmed: {:?}", action, tx_hash);
        Ok(tx_hash)
    }

    fn wallet_error(&self, error: WalletError) -> ExecutorError {
        if self.classifier.is_user_cancellation(&error) {
            ExecutorError::UserCancelled
        } else {
            ExecutorError::Provider(error.message)
        }
    }

    async fn schedule_refresh(&self, account: Address) {
        let calculator = self.calculator.clone();
        let slot = self.position.clone();
        let vault = self.vault.clone();
        let delay = self.settings.settlement_delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match calculator.fetch(account, &vault).await {
                Some(position) => {
                    debug!("Position refreshed: {} shares", position.share_balance_formatted);
                    *slot.write().await = Some(position);
                }
                None => warn!("Position refresh after withdrawal failed"),
            }
        });

        if let Some(previous) = self.refresh.lock().await.replace(handle) {
            previous.abort();
        }
    }
}

/// `balance * requested / held`, all in raw share units
fn raw_share_amount(balance: U256, requested: U256, held: U256) -> Result<U256, ExecutorError> {
    if held.is_zero() {
        return Err(ExecutorError::Validation("No shares to withdraw".to_string()));
    }
    let raw = balance
        .checked_mul(requested)
        .ok_or_else(|| ExecutorError::Validation("Share amount too large".to_string()))?
        / held;

    if raw.is_zero() {
        return Err(ExecutorError::Validation("Please enter a valid share amount".to_string()));
    }
    Ok(raw.min(balance))
}
