//! CLI configuration.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use paychat_chat::{ChatConfig, DEFAULT_CHAT_PATH, DEFAULT_PROTECTED_PATH};
use paychat_settle::rpc::{DEVNET_RPC_URL, DEVNET_USDC_MINT};
use paychat_settle::RpcConfig;
use paychat_types::{
    TokenAmount, DEFAULT_PRICE, DEFAULT_TOKEN_SYMBOL, MAX_STREAM_DURATION_SECS, USDC_DECIMALS,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Expand environment variables in a string.
/// Supports `${VAR_NAME}` syntax; unknown variables are left as written.
fn expand_env_vars(input: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());
    re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

fn expand_opt(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        *v = expand_env_vars(v);
    }
}

/// CLI configuration loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Chat server configuration.
    pub server: ServerConfig,
    /// Pricing configuration.
    pub payment: PaymentConfig,
    /// Wallet configuration.
    pub wallet: WalletConfig,
    /// Balance RPC configuration.
    pub rpc: RpcSection,
}

impl CliConfig {
    /// Load configuration from a file.
    ///
    /// A missing file yields the defaults. Environment variables in
    /// `${VAR}` format are expanded in URLs and wallet secrets.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&contents)?;

        config.server.base_url = expand_env_vars(&config.server.base_url);
        config.rpc.url = expand_env_vars(&config.rpc.url);
        expand_opt(&mut config.wallet.account);
        expand_opt(&mut config.wallet.key);
        expand_opt(&mut config.wallet.payment_header);

        Ok(config)
    }

    /// Load configuration from the default location.
    pub fn load_default() -> CliResult<Self> {
        Self::load(&default_config_path())
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Per-message price.
    pub fn price(&self) -> CliResult<TokenAmount> {
        let price = TokenAmount::parse(&self.payment.price, self.payment.decimals)?;
        if price.is_zero() {
            return Err(CliError::config("payment.price must be greater than zero"));
        }
        Ok(price)
    }

    /// Settings for a conversation.
    pub fn chat_config(&self) -> CliResult<ChatConfig> {
        Ok(ChatConfig::new(self.price()?)?
            .with_symbol(&self.payment.token_symbol)
            .with_chat_path(&self.server.chat_path))
    }

    /// Settings for the balance oracle.
    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            url: self.rpc.url.clone(),
            mint: self.rpc.mint.clone(),
            decimals: self.payment.decimals,
            timeout: Duration::from_secs(self.rpc.timeout_secs),
        }
    }

    /// The configured wallet address.
    pub fn account(&self) -> CliResult<&str> {
        self.wallet
            .account
            .as_deref()
            .filter(|a| !a.is_empty())
            .ok_or(CliError::WalletNotConfigured)
    }
}

/// Chat server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the chat server.
    pub base_url: String,
    /// Path of the streaming chat endpoint.
    pub chat_path: String,
    /// Path of the protected demo resource.
    pub protected_path: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            protected_path: DEFAULT_PROTECTED_PATH.to_string(),
            timeout_secs: MAX_STREAM_DURATION_SECS,
        }
    }
}

impl ServerConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pricing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Price of one message in whole tokens, e.g. `"0.1"`.
    pub price: String,
    /// Token symbol.
    pub token_symbol: String,
    /// Token decimals.
    pub decimals: u8,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            price: DEFAULT_PRICE.to_string(),
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            decimals: USDC_DECIMALS,
        }
    }
}

/// Wallet configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Address of the paying wallet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// Persisted base64url key material.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Pre-signed `X-PAYMENT` header value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_header: Option<String>,
}

/// Balance RPC configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSection {
    /// JSON-RPC endpoint.
    pub url: String,
    /// Token mint address.
    pub mint: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            url: DEVNET_RPC_URL.to_string(),
            mint: DEVNET_USDC_MINT.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Get the default base directory.
pub fn default_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PAYCHAT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("io", "paychat", "paychat")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".paychat")
        })
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    default_base_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.server.chat_path, "/api/chat");
        assert_eq!(config.server.timeout(), Duration::from_secs(30));
        assert_eq!(config.payment.price, "0.1");
        assert_eq!(config.rpc.url, DEVNET_RPC_URL);
        assert_eq!(config.price().unwrap().to_string(), "0.1");
        assert!(matches!(config.account(), Err(CliError::WalletNotConfigured)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = CliConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CliConfig::default();
        config.wallet.account = Some("wallet1".to_string());
        config.payment.price = "0.25".to_string();
        config.save(&path).unwrap();

        let loaded = CliConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.account().unwrap(), "wallet1");
        assert_eq!(loaded.chat_config().unwrap().price.to_fixed(2), "0.25");
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbase_url = \"https://chat.example.com\"\n").unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.server.base_url, "https://chat.example.com");
        assert_eq!(config.server.chat_path, "/api/chat");
        assert_eq!(config.payment, PaymentConfig::default());
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("PAYCHAT_TEST_RPC_KEY", "secret123");
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[rpc]\nurl = \"https://rpc.example.com/?key=${PAYCHAT_TEST_RPC_KEY}\"\n\
             [wallet]\npayment_header = \"${PAYCHAT_TEST_UNSET_VAR}\"\n",
        )
        .unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.rpc.url, "https://rpc.example.com/?key=secret123");
        assert_eq!(
            config.wallet.payment_header.as_deref(),
            Some("${PAYCHAT_TEST_UNSET_VAR}")
        );
    }

    #[test]
    fn test_invalid_price() {
        let mut config = CliConfig::default();
        config.payment.price = "abc".to_string();
        assert!(matches!(config.price(), Err(CliError::Amount(_))));

        config.payment.price = "0".to_string();
        assert!(matches!(config.price(), Err(CliError::Config(_))));

        config.payment.price = "0.0000001".to_string();
        assert!(matches!(config.price(), Err(CliError::Amount(_))));
    }

    #[test]
    fn test_rpc_config() {
        let config = CliConfig::default();
        let rpc = config.rpc_config();
        assert_eq!(rpc.mint, DEVNET_USDC_MINT);
        assert_eq!(rpc.decimals, 6);
    }
}
