//! Chain module - the node-facing side of the submitter
//!
//! This module provides:
//! - The `ChainTransport` seam the submitter talks through
//! - A Tendermint JSON-RPC implementation of it
//! - Decoding of on-chain account records

pub mod rpc;

pub use rpc::connect;

use crate::config::BroadcastMode;
use crate::error::{SubmitterError, SubmitterResult};
use crate::proto::{EthAccount, BASE_ACCOUNT_TYPE_URL, ETH_ACCOUNT_TYPE_URL};

use async_trait::async_trait;
use cosmos_sdk_proto::cosmos::auth::v1beta1::BaseAccount;
use cosmos_sdk_proto::Any;
use prost::Message;

/// Node identity and head of chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub chain_id: String,
    pub latest_height: u64,
    pub catching_up: bool,
}

/// Signing parameters of an on-chain account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Node acknowledgment of a broadcast (not a confirmation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastAck {
    pub hash: String,
    /// Check-time result code; always 0 for async broadcasts
    pub code: u32,
    pub log: String,
}

/// An included transaction as recorded by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub hash: String,
    pub height: u64,
    pub code: u32,
    pub log: String,
    pub gas_wanted: u64,
    pub gas_used: u64,
    /// Raw `TxRaw` bytes
    pub tx_bytes: Vec<u8>,
}

impl TxRecord {
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }
}

/// Operations the submitter needs from a chain node
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainTransport: Send + Sync {
    /// Chain ID and latest block height
    async fn status(&self) -> SubmitterResult<NodeStatus>;

    /// Account number and sequence for a bech32 address
    async fn account(&self, address: &str) -> SubmitterResult<AccountInfo>;

    /// Gas used by a dry run of the encoded tx
    async fn simulate(&self, tx_bytes: Vec<u8>) -> SubmitterResult<u64>;

    /// Hand a signed, encoded tx to the node
    async fn broadcast(&self, mode: BroadcastMode, tx_bytes: Vec<u8>) -> SubmitterResult<BroadcastAck>;

    /// Look up an included tx; `None` while the node has no record of it
    async fn tx(&self, hash: &str) -> SubmitterResult<Option<TxRecord>>;
}

/// Decode an account record, accepting plain and Ethereum-style accounts
pub fn decode_account(account: &Any) -> SubmitterResult<AccountInfo> {
    let base = match account.type_url.as_str() {
        ETH_ACCOUNT_TYPE_URL => EthAccount::decode(account.value.as_slice())
            .map_err(|e| SubmitterError::Submission(format!("Invalid EthAccount: {}", e)))?
            .base_account
            .ok_or_else(|| SubmitterError::Submission("EthAccount without base account".to_string()))?,
        BASE_ACCOUNT_TYPE_URL => BaseAccount::decode(account.value.as_slice())
            .map_err(|e| SubmitterError::Submission(format!("Invalid BaseAccount: {}", e)))?,
        other => {
            return Err(SubmitterError::Submission(format!(
                "Unsupported account type {}",
                other
            )))
        }
    };

    Ok(AccountInfo {
        account_number: base.account_number,
        sequence: base.sequence,
    })
}
