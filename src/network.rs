//! Network profiles
//!
//! Built-in deployments:
//! - mainnet: `injective-1`
//! - testnet: `injective-888`
//! - local: a single node on localhost
//!
//! Profiles under `[networks.<name>]` in the config add to or override these.

use crate::config::NetworkConfig;
use crate::error::{SubmitterError, SubmitterResult};

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Decimals of the native fee token
pub const NATIVE_DECIMALS: u32 = 18;

/// Connection parameters for one chain deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    pub chain_id: String,
    /// Tendermint RPC endpoint
    pub rpc_endpoint: String,
    pub grpc_endpoint: String,
    /// PEM bundle trusted in addition to the system roots
    pub tls_cert: Option<PathBuf>,
    pub fee_denom: String,
}

impl NetworkProfile {
    fn builtin(name: &str, chain_id: &str, rpc: &str, grpc: &str) -> Self {
        Self {
            name: name.to_string(),
            chain_id: chain_id.to_string(),
            rpc_endpoint: rpc.to_string(),
            grpc_endpoint: grpc.to_string(),
            tls_cert: None,
            fee_denom: "inj".to_string(),
        }
    }
}

fn builtin_profile(name: &str) -> Option<NetworkProfile> {
    match name {
        "mainnet" => Some(NetworkProfile::builtin(
            "mainnet",
            "injective-1",
            "https://sentry.tm.injective.network:443",
            "sentry.chain.grpc.injective.network:443",
        )),
        "testnet" => Some(NetworkProfile::builtin(
            "testnet",
            "injective-888",
            "https://testnet.sentry.tm.injective.network:443",
            "testnet.sentry.chain.grpc.injective.network:443",
        )),
        "local" => Some(NetworkProfile::builtin(
            "local",
            "injective-1",
            "http://localhost:26657",
            "localhost:9900",
        )),
        _ => None,
    }
}

/// Resolve a named deployment to its connection parameters
pub fn load_network_profile(
    name: &str,
    configured: &HashMap<String, NetworkConfig>,
) -> SubmitterResult<NetworkProfile> {
    let profile = match configured.get(name) {
        Some(config) => NetworkProfile {
            name: name.to_string(),
            chain_id: config.chain_id.clone(),
            rpc_endpoint: config.rpc_endpoint.clone(),
            grpc_endpoint: config.grpc_endpoint.clone(),
            tls_cert: config.tls_cert.clone(),
            fee_denom: config.fee_denom.clone(),
        },
        None => builtin_profile(name).ok_or_else(|| {
            SubmitterError::Configuration(format!("Unknown network {:?}", name))
        })?,
    };

    if profile.chain_id.trim().is_empty() {
        return Err(SubmitterError::Configuration(format!(
            "Network {:?} has no chain ID",
            name
        )));
    }
    if profile.rpc_endpoint.trim().is_empty() {
        return Err(SubmitterError::Configuration(format!(
            "Network {:?} has no RPC endpoint",
            name
        )));
    }
    if let Some(ref cert) = profile.tls_cert {
        if !cert.is_file() {
            return Err(SubmitterError::Configuration(format!(
                "TLS certificate {:?} for network {:?} not found",
                cert, name
            )));
        }
    }

    debug!(
        "Network {} resolved to chain {} via {}",
        profile.name, profile.chain_id, profile.rpc_endpoint
    );
    Ok(profile)
}
