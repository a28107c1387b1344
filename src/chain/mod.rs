//! Chain access: contract ABIs, read-only calls and the signing wallet
//!
//! Reads go through [`ChainReader`], writes through [`Wallet`]. Both are
//! traits so the executor and position calculator can run against
//! in-memory fakes.

mod classifier;
mod reader;
mod wallet;

pub use classifier::{Eip1193Classifier, WalletErrorClassifier};
pub use reader::RpcChainReader;
pub use wallet::{ConfirmFn, ContractCall, SignerWallet, Wallet, WalletError, USER_REJECTED_CODE};

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use async_trait::async_trait;
use eyre::Result;

// ============================================
// CONTRACT INTERFACES
// ============================================

sol! {
    /// Liquidity vault (ERC20 share token over a concentrated position)
    interface IVault {
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function getTotalAmounts() external view returns (uint256 total0, uint256 total1);
        function name() external view returns (string);
        function symbol() external view returns (string);
        function lowerTick() external view returns (int24);
        function upperTick() external view returns (int24);
        function isActive() external view returns (bool);

        function deposit(uint256 deposit0, uint256 deposit1, address to) external payable returns (uint256 shares);
        function withdraw(uint256 shares, address to) external returns (uint256 amount0, uint256 amount1);
    }

    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }

    /// Hedera Token Service system contract at 0x167
    interface IHederaTokenService {
        function approve(address token, address spender, uint256 amount) external returns (int64 responseCode);
    }
}

// ============================================
// READS
// ============================================

/// On-chain metadata of a vault contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultInfo {
    pub name: String,
    pub symbol: String,
    pub lower_tick: i32,
    pub upper_tick: i32,
    pub is_active: bool,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn share_balance(&self, vault: Address, account: Address) -> Result<U256>;

    async fn total_supply(&self, vault: Address) -> Result<U256>;

    /// Token reserves held by the vault: `(total0, total1)`
    async fn total_amounts(&self, vault: Address) -> Result<(U256, U256)>;

    async fn vault_info(&self, vault: Address) -> Result<VaultInfo>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256>;

    async fn native_balance(&self, owner: Address) -> Result<U256>;
}
