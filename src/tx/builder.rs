//! Transaction composition and `SIGN_MODE_DIRECT` signing

use super::gas::Amount;
use crate::error::{SubmitterError, SubmitterResult};
use crate::wallet::SigningIdentity;

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use cosmos_sdk_proto::cosmos::tx::signing::v1beta1::SignMode;
use cosmos_sdk_proto::cosmos::tx::v1beta1::mode_info::{Single, Sum};
use cosmos_sdk_proto::cosmos::tx::v1beta1::{
    AuthInfo, Fee, ModeInfo, SignDoc, SignerInfo, TxBody, TxRaw,
};
use cosmos_sdk_proto::Any;
use prost::Message;

/// Everything needed to produce one signed transaction
#[derive(Debug, Clone)]
pub struct TxParams<'a> {
    pub chain_id: &'a str,
    pub account_number: u64,
    pub sequence: u64,
    pub memo: &'a str,
    pub timeout_height: u64,
    pub gas_limit: u64,
    /// `None` for simulation, where the fee is not yet known
    pub fee: Option<&'a Amount>,
}

/// Build, sign and encode a transaction carrying `messages`
pub fn sign_tx(
    identity: &SigningIdentity,
    messages: Vec<Any>,
    params: &TxParams<'_>,
) -> SubmitterResult<Vec<u8>> {
    let body = TxBody {
        messages,
        memo: params.memo.to_string(),
        timeout_height: params.timeout_height,
        ..Default::default()
    };

    let fee = Fee {
        amount: params
            .fee
            .map(|fee| {
                vec![Coin {
                    denom: fee.denom.clone(),
                    amount: fee.atomic.to_string(),
                }]
            })
            .unwrap_or_default(),
        gas_limit: params.gas_limit,
        ..Default::default()
    };

    let auth_info = AuthInfo {
        signer_infos: vec![SignerInfo {
            public_key: Some(identity.public_key_any()),
            mode_info: Some(ModeInfo {
                sum: Some(Sum::Single(Single {
                    mode: SignMode::Direct as i32,
                })),
            }),
            sequence: params.sequence,
        }],
        fee: Some(fee),
        ..Default::default()
    };

    let body_bytes = body.encode_to_vec();
    let auth_info_bytes = auth_info.encode_to_vec();

    let sign_doc = SignDoc {
        body_bytes: body_bytes.clone(),
        auth_info_bytes: auth_info_bytes.clone(),
        chain_id: params.chain_id.to_string(),
        account_number: params.account_number,
    };
    let signature = identity.sign(&sign_doc.encode_to_vec())?;

    Ok(TxRaw {
        body_bytes,
        auth_info_bytes,
        signatures: vec![signature],
    }
    .encode_to_vec())
}

/// Fee recorded in an encoded transaction, in `denom`
pub fn decode_fee(tx_bytes: &[u8], denom: &str) -> SubmitterResult<u128> {
    let invalid = |what: &str, e: prost::DecodeError| {
        SubmitterError::Rpc {
            code: 0,
            message: format!("Invalid {}: {}", what, e),
        }
    };

    let raw = TxRaw::decode(tx_bytes).map_err(|e| invalid("tx bytes", e))?;
    let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice()).map_err(|e| invalid("auth info", e))?;

    let coin = auth_info
        .fee
        .unwrap_or_default()
        .amount
        .into_iter()
        .find(|coin| coin.denom == denom)
        .ok_or_else(|| SubmitterError::Rpc {
            code: 0,
            message: format!("No fee paid in {}", denom),
        })?;

    coin.amount.parse().map_err(|_| SubmitterError::Rpc {
        code: 0,
        message: format!("Invalid fee amount {:?}", coin.amount),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::TEST_PRIVATE_KEY;

    fn identity() -> SigningIdentity {
        SigningIdentity::from_private_key_hex(TEST_PRIVATE_KEY).unwrap()
    }

    fn message() -> Any {
        Any {
            type_url: "/cosmos.bank.v1beta1.MsgSend".to_string(),
            value: vec![],
        }
    }

    #[test]
    fn test_signed_tx_layout() {
        let identity = identity();
        let fee = Amount::new(75_000_000_000_000, "inj", 18);
        let params = TxParams {
            chain_id: "injective-888",
            account_number: 12,
            sequence: 5,
            memo: "listing",
            timeout_height: 1230,
            gas_limit: 150_000,
            fee: Some(&fee),
        };
        let bytes = sign_tx(&identity, vec![message()], &params).unwrap();

        let raw = TxRaw::decode(bytes.as_slice()).unwrap();
        assert_eq!(raw.signatures.len(), 1);
        assert_eq!(raw.signatures[0].len(), 64);

        let body = TxBody::decode(raw.body_bytes.as_slice()).unwrap();
        assert_eq!(body.memo, "listing");
        assert_eq!(body.timeout_height, 1230);
        assert_eq!(body.messages, vec![message()]);

        let auth_info = AuthInfo::decode(raw.auth_info_bytes.as_slice()).unwrap();
        let signer = &auth_info.signer_infos[0];
        assert_eq!(signer.sequence, 5);
        assert_eq!(signer.public_key, Some(identity.public_key_any()));
        assert_eq!(auth_info.fee.unwrap().gas_limit, 150_000);

        assert_eq!(decode_fee(&bytes, "inj").unwrap(), 75_000_000_000_000);
    }

    #[test]
    fn test_simulation_tx_has_no_fee() {
        let params = TxParams {
            chain_id: "injective-888",
            account_number: 1,
            sequence: 0,
            memo: "",
            timeout_height: 0,
            gas_limit: 0,
            fee: None,
        };
        let bytes = sign_tx(&identity(), vec![message()], &params).unwrap();
        assert!(decode_fee(&bytes, "inj").is_err());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let params = TxParams {
            chain_id: "injective-888",
            account_number: 1,
            sequence: 3,
            memo: "",
            timeout_height: 10,
            gas_limit: 100,
            fee: None,
        };
        let a = sign_tx(&identity(), vec![message()], &params).unwrap();
        let b = sign_tx(&identity(), vec![message()], &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_fee_rejects_garbage() {
        assert!(decode_fee(&[0xff, 0xff, 0xff], "inj").is_err());
    }
}
