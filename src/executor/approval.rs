//! Allowance strategies, tried in order until one is confirmed

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;

use crate::chain::{ContractCall, IHederaTokenService, IERC20};
use crate::tokens::{TokenId, HTS_PRECOMPILE};

pub trait ApprovalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Call granting `spender` an allowance of `amount` on `token`
    fn build(&self, token: TokenId, spender: Address, amount: U256, gas_limit: u64) -> ContractCall;
}

/// `approve(spender, amount)` on the token's EVM alias
#[derive(Debug, Clone, Copy, Default)]
pub struct Erc20Approval;

impl ApprovalStrategy for Erc20Approval {
    fn name(&self) -> &'static str {
        "erc20"
    }

    fn build(&self, token: TokenId, spender: Address, amount: U256, gas_limit: u64) -> ContractCall {
        ContractCall {
            to: token.to_evm_address(),
            data: IERC20::approveCall { spender, amount }.abi_encode().into(),
            value: U256::ZERO,
            gas_limit,
            description: format!("Approve {} of token {} for {}", amount, token, spender),
        }
    }
}

/// `approve(token, spender, amount)` on the token service system contract
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecompileApproval;

impl ApprovalStrategy for PrecompileApproval {
    fn name(&self) -> &'static str {
        "hts-precompile"
    }

    fn build(&self, token: TokenId, spender: Address, amount: U256, gas_limit: u64) -> ContractCall {
        ContractCall {
            to: HTS_PRECOMPILE,
            data: IHederaTokenService::approveCall {
                token: token.to_evm_address(),
                spender,
                amount,
            }
            .abi_encode()
            .into(),
            value: U256::ZERO,
            gas_limit,
            description: format!("Approve {} of token {} for {} (HTS)", amount, token, spender),
        }
    }
}

pub fn default_strategies() -> Vec<Box<dyn ApprovalStrategy>> {
    vec![Box::new(Erc20Approval), Box::new(PrecompileApproval)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn vault() -> Address {
        Address::from_str("0x00000000000000000000000000000000005a1b2c").unwrap()
    }

    #[test]
    fn test_erc20_targets_token_alias() {
        let usdc = TokenId::new(456858);
        let call = Erc20Approval.build(usdc, vault(), U256::from(1_000_000u64), 800_000);

        assert_eq!(call.to, usdc.to_evm_address());
        assert_eq!(call.value, U256::ZERO);
        assert_eq!(call.gas_limit, 800_000);

        let decoded = IERC20::approveCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.spender, vault());
        assert_eq!(decoded.amount, U256::from(1_000_000u64));
    }

    #[test]
    fn test_precompile_targets_0x167() {
        let usdc = TokenId::new(456858);
        let call = PrecompileApproval.build(usdc, vault(), U256::from(42u64), 800_000);

        assert_eq!(call.to, HTS_PRECOMPILE);
        let decoded = IHederaTokenService::approveCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.token, usdc.to_evm_address());
        assert_eq!(decoded.spender, vault());
        assert_eq!(decoded.amount, U256::from(42u64));
    }

    #[test]
    fn test_default_order() {
        let names: Vec<_> = default_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["erc20", "hts-precompile"]);
    }
}
