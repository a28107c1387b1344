//! Tells a user's refusal apart from a real failure

use super::wallet::{WalletError, USER_REJECTED_CODE};

/// Message fragments wallets use when the user refuses to sign
const REJECTION_PHRASES: [&str; 6] = [
    "user rejected",
    "user denied",
    "transaction was rejected",
    "user cancelled",
    "cancelled by user",
    "action_rejected",
];

pub trait WalletErrorClassifier: Send + Sync {
    fn is_user_cancellation(&self, error: &WalletError) -> bool;
}

/// EIP-1193 code 4001, or one of the common rejection messages
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip1193Classifier;

impl WalletErrorClassifier for Eip1193Classifier {
    fn is_user_cancellation(&self, error: &WalletError) -> bool {
        if error.code == Some(USER_REJECTED_CODE) {
            return true;
        }
        let message = error.message.to_lowercase();
        REJECTION_PHRASES.iter().any(|phrase| message.contains(phrase))
    }
}
