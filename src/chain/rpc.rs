//! Tendermint JSON-RPC transport
//!
//! Byte parameters follow the RPC's JSON encoding: `tx` and `hash` are
//! base64, `abci_query` data is hex. Cosmos SDK queries (account lookup,
//! simulation) go through `abci_query` with their gRPC method path.

use super::{decode_account, AccountInfo, BroadcastAck, ChainTransport, NodeStatus, TxRecord};
use crate::config::BroadcastMode;
use crate::error::{SubmitterError, SubmitterResult};
use crate::network::NetworkProfile;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cosmos_sdk_proto::cosmos::auth::v1beta1::{QueryAccountRequest, QueryAccountResponse};
use cosmos_sdk_proto::cosmos::tx::v1beta1::{SimulateRequest, SimulateResponse};
use prost::Message;
use reqwest::{Certificate, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const ACCOUNT_QUERY_PATH: &str = "/cosmos.auth.v1beta1.Query/Account";
const SIMULATE_PATH: &str = "/cosmos.tx.v1beta1.Service/Simulate";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Open connection to a node's RPC endpoint
pub struct RpcConnection {
    client: Client,
    endpoint: String,
    chain_id: String,
    next_id: AtomicU64,
}

/// Connect to the profile's RPC endpoint and check the node serves its chain
pub async fn connect(profile: &NetworkProfile) -> SubmitterResult<RpcConnection> {
    let connection_error = |message: String| SubmitterError::Connection {
        endpoint: profile.rpc_endpoint.clone(),
        message,
    };

    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
    if let Some(ref cert_path) = profile.tls_cert {
        let pem = std::fs::read(cert_path)
            .map_err(|e| connection_error(format!("Failed to read TLS certificate {:?}: {}", cert_path, e)))?;
        let cert = Certificate::from_pem(&pem)
            .map_err(|e| connection_error(format!("Invalid TLS certificate {:?}: {}", cert_path, e)))?;
        builder = builder.add_root_certificate(cert);
    }
    let client = builder
        .build()
        .map_err(|e| connection_error(format!("Failed to build HTTP client: {}", e)))?;

    let connection = RpcConnection {
        client,
        endpoint: profile.rpc_endpoint.clone(),
        chain_id: profile.chain_id.clone(),
        next_id: AtomicU64::new(1),
    };

    let status = connection.status().await.map_err(|e| match e {
        SubmitterError::Connection { .. } => e,
        other => connection_error(format!("Handshake failed: {}", other)),
    })?;

    if status.chain_id != profile.chain_id {
        return Err(connection_error(format!(
            "Node serves chain {} but profile {} expects {}",
            status.chain_id, profile.name, profile.chain_id
        )));
    }
    if status.catching_up {
        warn!("Node {} is still catching up", profile.rpc_endpoint);
    }

    info!(
        "Connected to {} (chain {}, height {})",
        profile.rpc_endpoint, status.chain_id, status.latest_height
    );
    Ok(connection)
}

impl RpcConnection {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Issue a JSON-RPC call and unwrap its result
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> SubmitterResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!("RPC {} (id {}) to {}", method, id, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SubmitterError::Connection {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let envelope: RpcEnvelope<T> = response.json().await.map_err(|e| SubmitterError::Connection {
            endpoint: self.endpoint.clone(),
            message: format!("Invalid {} response (HTTP {}): {}", method, status, e),
        })?;

        if let Some(error) = envelope.error {
            let data = error.data.unwrap_or_default();
            let message = if data.is_empty() {
                error.message
            } else {
                format!("{}: {}", error.message, data)
            };
            return Err(SubmitterError::Rpc {
                code: error.code,
                message,
            });
        }

        envelope.result.ok_or_else(|| SubmitterError::Rpc {
            code: 0,
            message: format!("{} returned neither result nor error", method),
        })
    }

    /// Run an ABCI query and return the raw response value
    async fn abci_query(&self, path: &str, data: Vec<u8>) -> SubmitterResult<Vec<u8>> {
        let result: AbciQueryResult = self
            .call(
                "abci_query",
                json!({
                    "path": path,
                    "data": hex::encode(data),
                    "height": "0",
                    "prove": false,
                }),
            )
            .await?;

        let response = result.response;
        if response.code != 0 {
            return Err(SubmitterError::Rpc {
                code: i64::from(response.code),
                message: response.log,
            });
        }

        decode_base64(response.value.as_deref().unwrap_or_default())
    }
}

#[async_trait]
impl ChainTransport for RpcConnection {
    async fn status(&self) -> SubmitterResult<NodeStatus> {
        let result: StatusResult = self.call("status", json!({})).await?;
        Ok(NodeStatus {
            chain_id: result.node_info.network,
            latest_height: result.sync_info.latest_block_height.value()?,
            catching_up: result.sync_info.catching_up,
        })
    }

    async fn account(&self, address: &str) -> SubmitterResult<AccountInfo> {
        let request = QueryAccountRequest {
            address: address.to_string(),
        };
        let value = self.abci_query(ACCOUNT_QUERY_PATH, request.encode_to_vec()).await?;

        let response = QueryAccountResponse::decode(value.as_slice())
            .map_err(|e| SubmitterError::Submission(format!("Invalid account response: {}", e)))?;
        let account = response
            .account
            .ok_or_else(|| SubmitterError::Submission(format!("Account {} not found", address)))?;
        decode_account(&account)
    }

    async fn simulate(&self, tx_bytes: Vec<u8>) -> SubmitterResult<u64> {
        let request = SimulateRequest {
            tx_bytes,
            ..Default::default()
        };
        let value = self.abci_query(SIMULATE_PATH, request.encode_to_vec()).await?;

        let response = SimulateResponse::decode(value.as_slice())
            .map_err(|e| SubmitterError::Submission(format!("Invalid simulate response: {}", e)))?;
        response
            .gas_info
            .map(|info| info.gas_used)
            .ok_or_else(|| SubmitterError::Submission("Simulation returned no gas info".to_string()))
    }

    async fn broadcast(&self, mode: BroadcastMode, tx_bytes: Vec<u8>) -> SubmitterResult<BroadcastAck> {
        let method = match mode {
            BroadcastMode::Sync => "broadcast_tx_sync",
            BroadcastMode::Async => "broadcast_tx_async",
        };
        let result: BroadcastResult = self
            .call(method, json!({ "tx": BASE64.encode(tx_bytes) }))
            .await?;

        Ok(BroadcastAck {
            hash: result.hash,
            code: result.code,
            log: result.log,
        })
    }

    async fn tx(&self, hash: &str) -> SubmitterResult<Option<TxRecord>> {
        let hash_bytes = hex::decode(hash)
            .map_err(|e| SubmitterError::query(hash, format!("Invalid tx hash: {}", e)))?;

        let result: TxResult = match self
            .call("tx", json!({ "hash": BASE64.encode(hash_bytes), "prove": false }))
            .await
        {
            Ok(result) => result,
            Err(SubmitterError::Rpc { message, .. }) if message.contains("not found") => {
                debug!("Tx {} not found yet", hash);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(TxRecord {
            hash: result.hash,
            height: result.height.value()?,
            code: result.tx_result.code,
            log: result.tx_result.log,
            gas_wanted: result.tx_result.gas_wanted.value()?,
            gas_used: result.tx_result.gas_used.value()?,
            tx_bytes: decode_base64(&result.tx)?,
        }))
    }
}

fn decode_base64(value: &str) -> SubmitterResult<Vec<u8>> {
    BASE64.decode(value).map_err(|e| SubmitterError::Rpc {
        code: 0,
        message: format!("Invalid base64 payload: {}", e),
    })
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    data: Option<String>,
}

/// Integers arrive as strings from newer nodes and as numbers from older ones
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcInt {
    Text(String),
    Number(u64),
}

impl RpcInt {
    fn value(&self) -> SubmitterResult<u64> {
        match self {
            RpcInt::Number(n) => Ok(*n),
            RpcInt::Text(s) => s.parse().map_err(|_| SubmitterError::Rpc {
                code: 0,
                message: format!("Invalid integer {:?}", s),
            }),
        }
    }
}

impl Default for RpcInt {
    fn default() -> Self {
        RpcInt::Number(0)
    }
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    node_info: NodeInfo,
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    network: String,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: RpcInt,
    #[serde(default)]
    catching_up: bool,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
    response: AbciResponse,
}

#[derive(Debug, Deserialize)]
struct AbciResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BroadcastResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    hash: String,
    height: RpcInt,
    tx_result: DeliverResult,
    #[serde(default)]
    tx: String,
}

#[derive(Debug, Deserialize)]
struct DeliverResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    gas_wanted: RpcInt,
    #[serde(default)]
    gas_used: RpcInt,
}
