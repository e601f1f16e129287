//! Injective protobuf types that are not part of the Cosmos SDK set
//!
//! Message shapes follow the chain's `.proto` definitions field for field.

use cosmos_sdk_proto::cosmos::auth::v1beta1::BaseAccount;

pub const SPOT_MARKET_LAUNCH_PROPOSAL_TYPE_URL: &str =
    "/injective.exchange.v1beta1.SpotMarketLaunchProposal";
pub const MSG_SUBMIT_PROPOSAL_TYPE_URL: &str = "/cosmos.gov.v1beta1.MsgSubmitProposal";
pub const ETH_ACCOUNT_TYPE_URL: &str = "/injective.types.v1beta1.EthAccount";
pub const BASE_ACCOUNT_TYPE_URL: &str = "/cosmos.auth.v1beta1.BaseAccount";
pub const ETH_SECP256K1_PUBKEY_TYPE_URL: &str = "/injective.crypto.v1beta1.ethsecp256k1.PubKey";

/// `injective.exchange.v1beta1.SpotMarketLaunchProposal`
///
/// Decimal fields carry the 18-place fixed-point wire form.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SpotMarketLaunchProposal {
    #[prost(string, tag = "1")]
    pub title: String,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(string, tag = "3")]
    pub ticker: String,
    #[prost(string, tag = "4")]
    pub base_denom: String,
    #[prost(string, tag = "5")]
    pub quote_denom: String,
    #[prost(string, tag = "6")]
    pub min_price_tick_size: String,
    #[prost(string, tag = "7")]
    pub min_quantity_tick_size: String,
    #[prost(string, tag = "8")]
    pub maker_fee_rate: String,
    #[prost(string, tag = "9")]
    pub taker_fee_rate: String,
    #[prost(string, tag = "10")]
    pub min_notional: String,
}

/// `injective.types.v1beta1.EthAccount`
#[derive(Clone, PartialEq, prost::Message)]
pub struct EthAccount {
    #[prost(message, optional, tag = "1")]
    pub base_account: Option<BaseAccount>,
    #[prost(bytes = "vec", tag = "2")]
    pub code_hash: Vec<u8>,
}

/// `injective.crypto.v1beta1.ethsecp256k1.PubKey`
#[derive(Clone, PartialEq, prost::Message)]
pub struct EthSecp256k1PubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}
