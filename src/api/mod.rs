//! REST collaborators: vault listing backend and the AI chat relay

mod chat;
mod vaults;

pub use chat::{ChatClient, ChatError, ChatRequest};
pub use vaults::{ApiClient, BackendVault};
