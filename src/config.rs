//! Runtime configuration for vaultkeeper
//!
//! Read once at startup from the environment (and `.env`), or from a TOML
//! file. Nothing here is persisted by the client itself.

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// ============================================
// NETWORK
// ============================================

/// Active Hedera network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

impl FromStr for Network {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(eyre!("Unknown network \"{}\" (expected testnet or mainnet)", other)),
        }
    }
}

/// Endpoints and chain id for one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub network: Network,
    pub json_rpc_url: &'static str,
    pub mirror_node_url: &'static str,
    pub chain_id: u64,
}

impl Network {
    pub fn preset(&self) -> NetworkConfig {
        match self {
            Network::Testnet => NetworkConfig {
                network: Network::Testnet,
                json_rpc_url: "https://testnet.hashio.io/api",
                mirror_node_url: "https://testnet.mirrornode.hedera.com",
                chain_id: 296,
            },
            Network::Mainnet => NetworkConfig {
                network: Network::Mainnet,
                json_rpc_url: "https://mainnet.hashio.io/api",
                mirror_node_url: "https://mainnet.mirrornode.hedera.com",
                chain_id: 295,
            },
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// Active network (selects RPC relay, mirror node, chain id, token tables)
    pub network: Network,

    /// JSON-RPC relay override
    pub rpc_url: Option<String>,

    /// Mirror node override (base URL without `/api/v1`)
    pub mirror_node_url: Option<String>,

    // ========== Backend API ==========
    /// Vault listing backend
    pub api_base_url: String,

    /// Request timeout for the backend, in milliseconds
    pub api_timeout_ms: u64,

    /// Chat relay base URL; falls back to `api_base_url`
    pub chat_base_url: Option<String>,

    /// Log every REST request/response at info level
    pub enable_api_logging: bool,

    // ========== Wallet ==========
    /// Signing key for deposit/withdraw (KEEP SECRET!)
    pub wallet_private_key: Option<String>,

    /// Ask on the terminal before every transaction is signed
    pub confirm_transactions: bool,

    // ========== Transactions ==========
    pub approval_gas_limit: u64,

    /// Gas limit for vault deposit/withdraw calls
    pub vault_gas_limit: u64,

    /// Receipt polling interval in milliseconds
    pub receipt_poll_ms: u64,

    /// Wait after a withdrawal before re-reading the position
    pub settlement_delay_secs: u64,

    // ========== Refresh ==========
    pub refresh_interval_secs: u64,

    // ========== Environment ==========
    /// development / staging / production
    pub environment: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let network = match env_opt("VAULTKEEPER_NETWORK") {
            Some(value) => value.parse()?,
            None => defaults.network,
        };

        Ok(Self {
            network,
            rpc_url: env_opt("RPC_URL"),
            mirror_node_url: env_opt("MIRROR_NODE_URL"),

            api_base_url: env_opt("API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_timeout_ms: env_or("API_TIMEOUT_MS", defaults.api_timeout_ms),
            chat_base_url: env_opt("CHAT_BASE_URL"),
            enable_api_logging: env_or("ENABLE_API_LOGGING", defaults.enable_api_logging),

            wallet_private_key: env_opt("WALLET_PRIVATE_KEY"),
            confirm_transactions: env_or("CONFIRM_TRANSACTIONS", defaults.confirm_transactions),

            approval_gas_limit: env_or("APPROVAL_GAS_LIMIT", defaults.approval_gas_limit),
            vault_gas_limit: env_or("VAULT_GAS_LIMIT", defaults.vault_gas_limit),
            receipt_poll_ms: env_or("RECEIPT_POLL_MS", defaults.receipt_poll_ms),
            settlement_delay_secs: env_or("SETTLEMENT_DELAY_SECS", defaults.settlement_delay_secs),

            refresh_interval_secs: env_or("REFRESH_INTERVAL_SECS", defaults.refresh_interval_secs),

            environment: env_opt("ENVIRONMENT").unwrap_or(defaults.environment),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn network_config(&self) -> NetworkConfig {
        self.network.preset()
    }

    pub fn chain_id(&self) -> u64 {
        self.network.preset().chain_id
    }

    pub fn effective_rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.network.preset().json_rpc_url.to_string())
    }

    /// Mirror node REST root, always ending in `/api/v1`
    pub fn mirror_api_url(&self) -> String {
        let base = self
            .mirror_node_url
            .clone()
            .unwrap_or_else(|| self.network.preset().mirror_node_url.to_string());
        format!("{}/api/v1", base.trim_end_matches('/'))
    }

    pub fn effective_chat_url(&self) -> String {
        self.chat_base_url
            .clone()
            .unwrap_or_else(|| self.api_base_url.clone())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn settlement_delay(&self) -> Duration {
        Duration::from_secs(self.settlement_delay_secs)
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(eyre!("API_BASE_URL must be set"));
        }
        reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| eyre!("Invalid API_BASE_URL \"{}\": {}", self.api_base_url, e))?;

        if let Some(chat) = &self.chat_base_url {
            reqwest::Url::parse(chat)
                .map_err(|e| eyre!("Invalid CHAT_BASE_URL \"{}\": {}", chat, e))?;
        }

        let rpc = self.effective_rpc_url();
        if rpc.contains("YOUR_API_KEY") {
            return Err(eyre!("Invalid RPC_URL - please set a real JSON-RPC relay"));
        }
        reqwest::Url::parse(&rpc).map_err(|e| eyre!("Invalid RPC_URL \"{}\": {}", rpc, e))?;

        if self.api_timeout_ms == 0 {
            return Err(eyre!("API_TIMEOUT_MS must be greater than zero"));
        }
        if self.receipt_poll_ms == 0 {
            return Err(eyre!("RECEIPT_POLL_MS must be greater than zero"));
        }
        if self.approval_gas_limit == 0 || self.vault_gas_limit == 0 {
            return Err(eyre!("Gas limits must be greater than zero"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let preset = self.network_config();
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              VAULTKEEPER - CONFIGURATION                   ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Network:           {:^40} ║", self.network);
        println!("║ Chain ID:          {:^40} ║", preset.chain_id);
        println!("║ Environment:       {:^40} ║", self.environment);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ ENDPOINTS                                                  ║");
        println!("║ • RPC:             {:<40} ║", truncate(&self.effective_rpc_url(), 40));
        println!("║ • Mirror node:     {:<40} ║", truncate(&self.mirror_api_url(), 40));
        println!("║ • API:             {:<40} ║", truncate(&self.api_base_url, 40));
        println!("║ • Chat:            {:<40} ║", truncate(&self.effective_chat_url(), 40));
        println!("║ • API timeout:     {:>37} ms ║", self.api_timeout_ms);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ WALLET                                                     ║");
        println!("║ • Signer Key:      {:^40} ║",
            if self.wallet_private_key.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("║ • Confirm Prompts: {:^40} ║",
            if self.confirm_transactions { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            rpc_url: None,
            mirror_node_url: None,
            api_base_url: "https://manixai.eaglefi.io".to_string(),
            api_timeout_ms: 10_000,
            chat_base_url: None,
            enable_api_logging: false,
            wallet_private_key: None,
            confirm_transactions: true,
            approval_gas_limit: 800_000,
            vault_gas_limit: 15_000_000,
            receipt_poll_ms: 1_000,
            settlement_delay_secs: 2,
            refresh_interval_secs: 60,
            environment: "development".to_string(),
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.chain_id(), 295);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_network_presets() {
        let testnet = Network::Testnet.preset();
        assert_eq!(testnet.chain_id, 296);
        assert!(testnet.mirror_node_url.contains("testnet"));
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Testnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_mirror_url_normalization() {
        let mut config = Config::default();
        assert_eq!(config.mirror_api_url(), "https://mainnet.mirrornode.hedera.com/api/v1");

        config.mirror_node_url = Some("http://localhost:5551/".to_string());
        assert_eq!(config.mirror_api_url(), "http://localhost:5551/api/v1");
    }

    #[test]
    fn test_chat_url_falls_back_to_api() {
        let mut config = Config::default();
        assert_eq!(config.effective_chat_url(), config.api_base_url);

        config.chat_base_url = Some("http://localhost:8090".to_string());
        assert_eq!(config.effective_chat_url(), "http://localhost:8090");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.api_base_url = "not a url".to_string();
        assert_err!(config.validate());

        let mut config = Config::default();
        config.rpc_url = Some("https://rpc.example/YOUR_API_KEY".to_string());
        assert_err!(config.validate());

        let mut config = Config::default();
        config.vault_gas_limit = 0;
        assert_err!(config.validate());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.network = Network::Testnet;
        config.chat_base_url = Some("http://localhost:8090".to_string());

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.network, Network::Testnet);
        assert_eq!(parsed.chat_base_url, config.chat_base_url);
        assert_eq!(parsed.vault_gas_limit, 15_000_000);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("vaultkeeper-{}.toml", std::process::id()));
        let mut config = Config::default();
        config.network = Network::Testnet;
        config.refresh_interval_secs = 45;

        assert_ok!(config.save_to_file(&path));
        let loaded = assert_ok!(Config::from_file(&path));
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.network, Network::Testnet);
        assert_eq!(loaded.chain_id(), 296);
        assert_eq!(loaded.refresh_interval_secs, 45);
        assert_ok!(loaded.validate());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert_err!(Config::from_file("/nonexistent/vaultkeeper.toml"));
    }
}
