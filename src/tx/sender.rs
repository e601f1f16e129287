//! Transaction submission, inclusion polling and fee lookup

use super::builder::{decode_fee, sign_tx, TxParams};
use super::gas::{Amount, GasEstimator};
use crate::chain::{ChainTransport, TxRecord};
use crate::config::{BroadcastConfig, BroadcastMode, ConfirmationConfig, DepositConfig, GasConfig};
use crate::error::{SubmitterError, SubmitterResult};
use crate::network::{NetworkProfile, NATIVE_DECIMALS};
use crate::proposal::ProposalMessage;
use crate::wallet::SigningIdentity;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Outcome of a broadcast request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionHandle {
    pub tx_hash: String,
    /// Gas used by the dry run, when one was made
    pub simulated_gas: Option<u64>,
    pub gas_wanted: u64,
    /// Fee offered in the signed tx
    pub fee: Amount,
    pub mode: BroadcastMode,
}

/// Signs and broadcasts proposals, one at a time
pub struct TransactionSubmitter {
    /// Node connection
    transport: Arc<dyn ChainTransport>,
    chain_id: String,
    fee_denom: String,
    gas_estimator: GasEstimator,
    simulate: bool,
    broadcast: BroadcastConfig,
    confirmation: ConfirmationConfig,
    /// Hash of the submission not yet seen on chain
    in_flight: Option<String>,
}

impl TransactionSubmitter {
    /// Create a submitter bound to one connection and network
    pub fn new(
        transport: Arc<dyn ChainTransport>,
        profile: &NetworkProfile,
        gas: &GasConfig,
        broadcast: BroadcastConfig,
        confirmation: ConfirmationConfig,
    ) -> Self {
        Self {
            transport,
            chain_id: profile.chain_id.clone(),
            fee_denom: profile.fee_denom.clone(),
            gas_estimator: GasEstimator::new(gas),
            simulate: gas.simulate,
            broadcast,
            confirmation,
            in_flight: None,
        }
    }

    /// Hash of the submission still awaiting inclusion, if any
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    /// Sign and broadcast `message` as a governance proposal
    ///
    /// Returns once the node has acknowledged the tx; inclusion is not awaited.
    pub async fn submit(
        &mut self,
        identity: &SigningIdentity,
        message: &ProposalMessage,
        deposit: &DepositConfig,
    ) -> SubmitterResult<SubmissionHandle> {
        if let Some(ref pending) = self.in_flight {
            return Err(SubmitterError::Submission(format!(
                "Transaction {} is still in flight",
                pending
            )));
        }

        let submission_error =
            |step: &str, e: SubmitterError| SubmitterError::Submission(format!("{}: {}", step, e));

        let account = self
            .transport
            .account(identity.address())
            .await
            .map_err(|e| submission_error("account lookup failed", e))?;
        let status = self
            .transport
            .status()
            .await
            .map_err(|e| submission_error("status query failed", e))?;
        let timeout_height = status.latest_height + self.broadcast.timeout_height_offset;

        debug!(
            "Account {} number {} sequence {}, timeout height {}",
            identity.address(),
            account.account_number,
            account.sequence,
            timeout_height
        );

        let msg = message.to_submit_msg(identity.address(), deposit);
        let mut params = TxParams {
            chain_id: &self.chain_id,
            account_number: account.account_number,
            sequence: account.sequence,
            memo: &self.broadcast.memo,
            timeout_height,
            gas_limit: 0,
            fee: None,
        };

        let simulated = if self.simulate {
            let sim_tx = sign_tx(identity, vec![msg.clone()], &params)?;
            let gas_used = self
                .transport
                .simulate(sim_tx)
                .await
                .map_err(|e| submission_error("simulation failed", e))?;
            info!("Simulation used {} gas", gas_used);
            Some(gas_used)
        } else {
            None
        };

        let gas_limit = self.gas_estimator.gas_limit(simulated);
        let fee = self.gas_estimator.fee(gas_limit, &self.fee_denom, NATIVE_DECIMALS);
        params.gas_limit = gas_limit;
        params.fee = Some(&fee);

        let tx_bytes = sign_tx(identity, vec![msg], &params)?;
        let ack = self
            .transport
            .broadcast(self.broadcast.mode, tx_bytes)
            .await
            .map_err(|e| submission_error("broadcast failed", e))?;

        if ack.code != 0 {
            return Err(SubmitterError::Submission(format!(
                "Transaction {} rejected with code {}: {}",
                ack.hash, ack.code, ack.log
            )));
        }

        info!(
            "Transaction sent: {} (gas limit {}, fee {})",
            ack.hash, gas_limit, fee
        );
        self.in_flight = Some(ack.hash.clone());

        Ok(SubmissionHandle {
            tx_hash: ack.hash,
            simulated_gas: simulated,
            gas_wanted: gas_limit,
            fee,
            mode: self.broadcast.mode,
        })
    }

    /// Poll until the tx is included, backing off between lookups
    ///
    /// Gives up with a query error once the confirmation timeout elapses.
    pub async fn wait_for_inclusion(&mut self, handle: &SubmissionHandle) -> SubmitterResult<TxRecord> {
        let transport = self.transport.clone();
        let hash = handle.tx_hash.clone();
        let initial = Duration::from_millis(self.confirmation.initial_backoff_ms);
        let max_backoff = Duration::from_millis(self.confirmation.max_backoff_ms).max(initial);
        let multiplier = self.confirmation.backoff_multiplier;
        let limit = Duration::from_millis(self.confirmation.timeout_ms);

        let poll = async {
            let mut backoff = initial;
            let mut attempts = 0u32;
            loop {
                attempts += 1;
                match transport.tx(&hash).await {
                    Ok(Some(record)) => {
                        debug!("Tx {} found after {} lookups", hash, attempts);
                        return Ok(record);
                    }
                    Ok(None) => debug!("Tx {} not included yet (lookup {})", hash, attempts),
                    Err(e @ SubmitterError::Connection { .. }) => {
                        warn!("Lookup of tx {} failed, will retry: {}", hash, e)
                    }
                    Err(e) => return Err(SubmitterError::query(&hash, e.to_string())),
                }
                sleep(backoff).await;
                backoff = backoff.saturating_mul(multiplier).min(max_backoff);
            }
        };

        let record = match timeout(limit, poll).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SubmitterError::query(
                    &handle.tx_hash,
                    format!("not included within {} ms", limit.as_millis()),
                ))
            }
        };

        self.in_flight = None;
        if record.succeeded() {
            info!("Transaction {} included at height {}", record.hash, record.height);
        } else {
            warn!(
                "Transaction {} included at height {} but failed with code {}: {}",
                record.hash, record.height, record.code, record.log
            );
        }
        Ok(record)
    }

    /// Fee paid by an included tx
    ///
    /// A single lookup; fails if the node has no record of the tx yet.
    pub async fn query_fee(&mut self, handle: &SubmissionHandle) -> SubmitterResult<Amount> {
        let record = self
            .transport
            .tx(&handle.tx_hash)
            .await
            .map_err(|e| SubmitterError::query(&handle.tx_hash, e.to_string()))?
            .ok_or_else(|| {
                SubmitterError::query(&handle.tx_hash, "transaction has not been processed yet")
            })?;

        self.in_flight = None;
        let atomic = decode_fee(&record.tx_bytes, &self.fee_denom)
            .map_err(|e| SubmitterError::query(&handle.tx_hash, e.to_string()))?;
        Ok(Amount::new(atomic, &self.fee_denom, NATIVE_DECIMALS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{AccountInfo, BroadcastAck, MockChainTransport, NodeStatus};
    use crate::network::load_network_profile;
    use crate::proposal::{build_proposal, sample_fields};
    use crate::proto::MSG_SUBMIT_PROPOSAL_TYPE_URL;
    use crate::wallet::TEST_PRIVATE_KEY;
    use cosmos_sdk_proto::cosmos::tx::v1beta1::{TxBody, TxRaw};
    use prost::Message;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    fn identity() -> SigningIdentity {
        SigningIdentity::from_private_key_hex(TEST_PRIVATE_KEY).unwrap()
    }

    fn fast_confirmation() -> ConfirmationConfig {
        ConfirmationConfig {
            initial_backoff_ms: 5,
            max_backoff_ms: 20,
            backoff_multiplier: 2,
            timeout_ms: 100,
        }
    }

    /// Node that accepts the account, status and simulation steps of a submission
    fn node(sent: Arc<Mutex<Vec<u8>>>) -> MockChainTransport {
        let mut mock = MockChainTransport::new();
        mock.expect_account().returning(|_| {
            Ok(AccountInfo {
                account_number: 12,
                sequence: 5,
            })
        });
        mock.expect_status().returning(|| {
            Ok(NodeStatus {
                chain_id: "injective-888".to_string(),
                latest_height: 1200,
                catching_up: false,
            })
        });
        mock.expect_simulate().returning(|_| Ok(130_000));
        mock.expect_broadcast().returning(move |_, bytes| {
            *sent.lock().unwrap() = bytes;
            Ok(BroadcastAck {
                hash: "ABCD".to_string(),
                code: 0,
                log: String::new(),
            })
        });
        mock
    }

    fn submitter(mock: MockChainTransport, gas: GasConfig) -> TransactionSubmitter {
        let profile = load_network_profile("testnet", &HashMap::new()).unwrap();
        TransactionSubmitter::new(
            Arc::new(mock),
            &profile,
            &gas,
            BroadcastConfig::default(),
            fast_confirmation(),
        )
    }

    fn record(tx_bytes: Vec<u8>) -> TxRecord {
        TxRecord {
            hash: "ABCD".to_string(),
            height: 1205,
            code: 0,
            log: String::new(),
            gas_wanted: 150_000,
            gas_used: 131_000,
            tx_bytes,
        }
    }

    #[tokio::test]
    async fn test_submit_signs_simulated_fee() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut submitter = submitter(node(sent.clone()), GasConfig::default());
        let fields = sample_fields();
        let proposal = build_proposal(&fields).unwrap();

        let handle = submitter
            .submit(&identity(), &proposal, &fields.deposit)
            .await
            .unwrap();

        assert_eq!(handle.tx_hash, "ABCD");
        assert_eq!(handle.simulated_gas, Some(130_000));
        assert_eq!(handle.gas_wanted, 150_000);
        assert_eq!(handle.mode, BroadcastMode::Sync);
        assert_eq!(handle.fee.to_string(), "0.000075 INJ");
        assert_eq!(submitter.in_flight(), Some("ABCD"));

        let bytes = sent.lock().unwrap().clone();
        let raw = TxRaw::decode(bytes.as_slice()).unwrap();
        let body = TxBody::decode(raw.body_bytes.as_slice()).unwrap();
        assert_eq!(body.timeout_height, 1230);
        assert_eq!(body.messages[0].type_url, MSG_SUBMIT_PROPOSAL_TYPE_URL);
        assert_eq!(decode_fee(&bytes, "inj").unwrap(), 75_000_000_000_000);
    }

    #[tokio::test]
    async fn test_query_fee_before_inclusion_is_query_error() {
        let mut mock = node(Arc::new(Mutex::new(Vec::new())));
        mock.expect_tx().returning(|_| Ok(None));
        let mut submitter = submitter(mock, GasConfig::default());
        let fields = sample_fields();
        let proposal = build_proposal(&fields).unwrap();

        let handle = submitter
            .submit(&identity(), &proposal, &fields.deposit)
            .await
            .unwrap();
        let err = submitter.query_fee(&handle).await.unwrap_err();

        assert!(matches!(err, SubmitterError::Query { .. }));
        assert!(err.to_string().contains("not been processed"));
        assert_eq!(submitter.in_flight(), Some("ABCD"));
    }

    #[tokio::test]
    async fn test_one_submission_in_flight() {
        let mut submitter = submitter(node(Arc::new(Mutex::new(Vec::new()))), GasConfig::default());
        let fields = sample_fields();
        let proposal = build_proposal(&fields).unwrap();

        assert_ok!(submitter.submit(&identity(), &proposal, &fields.deposit).await);
        let err = assert_err!(submitter.submit(&identity(), &proposal, &fields.deposit).await);

        assert!(matches!(err, SubmitterError::Submission(_)));
        assert!(err.to_string().contains("still in flight"));
    }

    #[tokio::test]
    async fn test_wait_then_query_fee() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut mock = node(sent.clone());
        let lookups = Arc::new(Mutex::new(0u32));
        let seen = sent.clone();
        mock.expect_tx().returning(move |_| {
            let mut count = lookups.lock().unwrap();
            *count += 1;
            // first lookup races the block
            if *count == 1 {
                Ok(None)
            } else {
                Ok(Some(record(seen.lock().unwrap().clone())))
            }
        });
        let mut submitter = submitter(mock, GasConfig::default());
        let fields = sample_fields();
        let proposal = build_proposal(&fields).unwrap();

        let handle = submitter
            .submit(&identity(), &proposal, &fields.deposit)
            .await
            .unwrap();
        let included = submitter.wait_for_inclusion(&handle).await.unwrap();
        assert_eq!(included.height, 1205);
        assert_eq!(submitter.in_flight(), None);

        let fee = submitter.query_fee(&handle).await.unwrap();
        assert_eq!(fee, handle.fee);
        assert_eq!(fee.to_string(), "0.000075 INJ");
    }

    #[tokio::test]
    async fn test_wait_times_out_with_query_error() {
        let mut mock = node(Arc::new(Mutex::new(Vec::new())));
        mock.expect_tx().returning(|_| Ok(None));
        let mut submitter = submitter(mock, GasConfig::default());
        let fields = sample_fields();
        let proposal = build_proposal(&fields).unwrap();

        let handle = submitter
            .submit(&identity(), &proposal, &fields.deposit)
            .await
            .unwrap();
        let err = submitter.wait_for_inclusion(&handle).await.unwrap_err();

        assert!(matches!(err, SubmitterError::Query { .. }));
        assert!(err.to_string().contains("not included within 100 ms"));
    }

    #[tokio::test]
    async fn test_check_tx_rejection() {
        let mut mock = MockChainTransport::new();
        mock.expect_account().returning(|_| {
            Ok(AccountInfo {
                account_number: 12,
                sequence: 5,
            })
        });
        mock.expect_status().returning(|| {
            Ok(NodeStatus {
                chain_id: "injective-888".to_string(),
                latest_height: 1200,
                catching_up: false,
            })
        });
        mock.expect_broadcast().returning(|_, _| {
            Ok(BroadcastAck {
                hash: "BEEF".to_string(),
                code: 5,
                log: "insufficient funds".to_string(),
            })
        });
        let gas = GasConfig {
            simulate: false,
            ..GasConfig::default()
        };
        let mut submitter = submitter(mock, gas);
        let fields = sample_fields();
        let proposal = build_proposal(&fields).unwrap();

        let err = submitter
            .submit(&identity(), &proposal, &fields.deposit)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitterError::Submission(_)));
        assert!(err.to_string().contains("insufficient funds"));
        assert_eq!(submitter.in_flight(), None);
    }

    #[tokio::test]
    async fn test_account_lookup_failure_is_submission_error() {
        let mut mock = MockChainTransport::new();
        mock.expect_account().returning(|_| {
            Err(SubmitterError::Rpc {
                code: 22,
                message: "account not found".to_string(),
            })
        });
        let mut submitter = submitter(mock, GasConfig::default());
        let fields = sample_fields();
        let proposal = build_proposal(&fields).unwrap();

        let err = submitter
            .submit(&identity(), &proposal, &fields.deposit)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitterError::Submission(_)));
        assert!(err.to_string().contains("account lookup failed"));
    }
}
