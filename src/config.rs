//! Configuration management for the proposal submitter
//!
//! Loads configuration from a TOML file with environment variable substitution.

use crate::error::{SubmitterError, SubmitterResult};
use crate::proposal::LegacyDec;

use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Name of the network profile to target
    pub network: String,
    /// Extra or overriding network profiles, keyed by name
    #[serde(default)]
    pub networks: HashMap<String, NetworkConfig>,
    pub keyring: KeyringConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    pub proposal: ProposalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: String,
    pub rpc_endpoint: String,
    #[serde(default)]
    pub grpc_endpoint: String,
    pub tls_cert: Option<PathBuf>,
    #[serde(default = "default_fee_denom")]
    pub fee_denom: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyringConfig {
    /// Key storage directory, `$HOME/.injectived` when unset
    pub dir: Option<PathBuf>,
    #[serde(default = "default_backend")]
    pub backend: String,
    pub account: String,
    #[serde(default)]
    pub passphrase: String,
    /// Hex private key; bypasses key storage when set
    pub private_key_hex: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    /// Price per gas unit in the fee denom's atomic units
    pub price: u64,
    /// Added on top of the simulated gas usage
    pub limit_buffer: u64,
    pub simulate: bool,
    /// Gas limit used when simulation is disabled
    pub default_limit: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            price: 500_000_000,
            limit_buffer: 20_000,
            simulate: true,
            default_limit: 400_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Return after the node's mempool check
    Sync,
    /// Return as soon as the node has received the tx
    Async,
}

impl fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BroadcastMode::Sync => write!(f, "sync"),
            BroadcastMode::Async => write!(f, "async"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    pub mode: BroadcastMode,
    /// Blocks past the latest height after which the tx is dropped
    pub timeout_height_offset: u64,
    #[serde(default)]
    pub memo: String,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            mode: BroadcastMode::Sync,
            timeout_height_offset: 30,
            memo: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: u32,
    pub timeout_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 4_000,
            backoff_multiplier: 2,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalConfig {
    pub title: String,
    pub description: String,
    pub ticker: String,
    pub base_denom: String,
    pub quote_denom: String,
    pub maker_fee_rate: LegacyDec,
    pub taker_fee_rate: LegacyDec,
    pub min_price_tick_size: LegacyDec,
    pub min_quantity_tick_size: LegacyDec,
    pub min_notional: Option<LegacyDec>,
    /// When both are set, tick sizes are given in human units and converted
    pub base_decimals: Option<u32>,
    pub quote_decimals: Option<u32>,
    pub deposit: DepositConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositConfig {
    /// Atomic amount as a decimal string (may exceed 64 bits)
    pub amount: String,
    #[serde(default = "default_fee_denom")]
    pub denom: String,
}

fn default_fee_denom() -> String {
    "inj".to_string()
}

fn default_backend() -> String {
    "file".to_string()
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> SubmitterResult<Self> {
        let config_path = env::var("PROPOSER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            SubmitterError::Configuration(format!(
                "Failed to read config file {:?}: {}",
                config_path, e
            ))
        })?;

        Self::from_toml_str(&config_str)
    }

    /// Parse settings from TOML text, substituting `${VAR}` references first
    pub fn from_toml_str(input: &str) -> SubmitterResult<Self> {
        let config_str = substitute_env_vars(input);

        let settings: Settings = toml::from_str(&config_str).map_err(|e| {
            SubmitterError::Configuration(format!("Failed to parse configuration: {}", e))
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> SubmitterResult<()> {
        if self.network.trim().is_empty() {
            return Err(SubmitterError::Configuration(
                "network name must not be empty".to_string(),
            ));
        }

        if self.keyring.account.trim().is_empty() && self.keyring.private_key_hex.is_none() {
            return Err(SubmitterError::Configuration(
                "keyring.account must be set when no private key is given".to_string(),
            ));
        }

        if self.gas.price == 0 {
            return Err(SubmitterError::Configuration(
                "gas.price must be positive".to_string(),
            ));
        }

        let c = &self.confirmation;
        if c.initial_backoff_ms == 0 || c.backoff_multiplier == 0 || c.timeout_ms == 0 {
            return Err(SubmitterError::Configuration(
                "confirmation backoff and timeout must be positive".to_string(),
            ));
        }
        if c.max_backoff_ms < c.initial_backoff_ms {
            tracing::warn!(
                "confirmation.max_backoff_ms ({}) below initial backoff - polling at a fixed interval",
                c.max_backoff_ms
            );
        }

        self.proposal.deposit.amount.parse::<u128>().map_err(|_| {
            SubmitterError::Configuration(format!(
                "proposal.deposit.amount {:?} is not an atomic integer amount",
                self.proposal.deposit.amount
            ))
        })?;

        Ok(())
    }

    /// Key storage directory, defaulting to `$HOME/.injectived`
    pub fn keyring_dir(&self) -> PathBuf {
        self.keyring.dir.clone().unwrap_or_else(|| {
            env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".injectived")
        })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern");

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
pub(crate) const SAMPLE_CONFIG: &str = r#"
network = "testnet"

[keyring]
dir = "/tmp/keys"
account = "inj-user"
passphrase = "${PROPOSER_TEST_PASSPHRASE}"

[proposal]
title = "test list title"
description = "test list desc"
ticker = "PUG/USDT"
base_denom = "peggy0xf9a06dE3F6639E6ee4F079095D5093644Ad85E8b"
quote_denom = "peggy0x44C21afAaF20c270EBbF5914Cfc3b5022173FEB7"
maker_fee_rate = "0.0010"
taker_fee_rate = "0.0100"
min_price_tick_size = "0.0001"
min_quantity_tick_size = "0.0001"

[proposal.deposit]
amount = "500000000000000000000"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_parse_with_defaults() {
        env::set_var("PROPOSER_TEST_PASSPHRASE", "12345678");
        let settings = Settings::from_toml_str(SAMPLE_CONFIG).unwrap();

        assert_eq!(settings.network, "testnet");
        assert_eq!(settings.keyring.backend, "file");
        assert_eq!(settings.keyring.passphrase, "12345678");
        assert_eq!(settings.keyring_dir(), PathBuf::from("/tmp/keys"));
        assert_eq!(settings.gas.price, 500_000_000);
        assert_eq!(settings.gas.limit_buffer, 20_000);
        assert_eq!(settings.broadcast.mode, BroadcastMode::Sync);
        assert_eq!(settings.broadcast.mode.to_string(), "sync");
        assert_eq!(settings.proposal.deposit.denom, "inj");
        assert_eq!(settings.proposal.maker_fee_rate.to_wire(), "1000000000000000");
    }

    #[test]
    fn test_float_fee_rate_is_rejected() {
        let input = SAMPLE_CONFIG.replace("maker_fee_rate = \"0.0010\"", "maker_fee_rate = 0.001");
        let err = Settings::from_toml_str(&input).unwrap_err();
        assert!(matches!(err, SubmitterError::Configuration(_)));
    }

    #[test]
    fn test_bad_deposit_is_rejected() {
        let input = SAMPLE_CONFIG.replace("500000000000000000000", "5e20");
        let err = Settings::from_toml_str(&input).unwrap_err();
        assert!(err.to_string().contains("deposit"));
    }

    #[test]
    fn test_configured_network_parses() {
        let input = format!(
            "{}\n[networks.devnet]\nchain_id = \"injective-777\"\nrpc_endpoint = \"http://127.0.0.1:26657\"\n",
            SAMPLE_CONFIG
        );
        let settings = Settings::from_toml_str(&input).unwrap();
        let devnet = &settings.networks["devnet"];
        assert_eq!(devnet.chain_id, "injective-777");
        assert_eq!(devnet.fee_denom, "inj");
        assert!(devnet.tls_cert.is_none());
    }
}
