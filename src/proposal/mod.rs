//! Spot market launch proposal construction
//!
//! `build_proposal` turns configured fields into an immutable
//! [`ProposalMessage`]. The value carries no timestamp or nonce, so identical
//! inputs always produce equal messages.

mod decimal;

pub use decimal::LegacyDec;

use crate::config::{DepositConfig, ProposalConfig};
use crate::error::{SubmitterError, SubmitterResult};
use crate::proto::{
    SpotMarketLaunchProposal, MSG_SUBMIT_PROPOSAL_TYPE_URL, SPOT_MARKET_LAUNCH_PROPOSAL_TYPE_URL,
};

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use cosmos_sdk_proto::cosmos::gov::v1beta1::MsgSubmitProposal;
use cosmos_sdk_proto::Any;
use prost::Message;
use tracing::debug;

/// Market-listing governance proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalMessage {
    pub title: String,
    pub description: String,
    pub ticker: String,
    pub base_denom: String,
    pub quote_denom: String,
    pub maker_fee_rate: LegacyDec,
    pub taker_fee_rate: LegacyDec,
    pub min_price_tick_size: LegacyDec,
    pub min_quantity_tick_size: LegacyDec,
    pub min_notional: LegacyDec,
}

/// Build a proposal from configured fields
pub fn build_proposal(fields: &ProposalConfig) -> SubmitterResult<ProposalMessage> {
    for (name, value) in [
        ("title", &fields.title),
        ("ticker", &fields.ticker),
        ("base_denom", &fields.base_denom),
        ("quote_denom", &fields.quote_denom),
    ] {
        if value.trim().is_empty() {
            return Err(SubmitterError::InvalidProposal(format!("{} must not be empty", name)));
        }
    }

    if fields.taker_fee_rate.is_negative() {
        return Err(SubmitterError::InvalidProposal(format!(
            "taker fee rate {} must not be negative",
            fields.taker_fee_rate
        )));
    }

    // Human tick sizes become chain units once both denoms' decimals are known
    let (min_price_tick_size, min_quantity_tick_size) =
        match (fields.base_decimals, fields.quote_decimals) {
            (Some(base), Some(quote)) => {
                let base = token_decimals("base_decimals", base)?;
                let quote = token_decimals("quote_decimals", quote)?;
                (
                    fields.min_price_tick_size.shift(quote - base)?,
                    fields.min_quantity_tick_size.shift(base)?,
                )
            }
            _ => (fields.min_price_tick_size, fields.min_quantity_tick_size),
        };

    if !min_price_tick_size.is_positive() || !min_quantity_tick_size.is_positive() {
        return Err(SubmitterError::InvalidProposal(
            "tick sizes must be positive".to_string(),
        ));
    }

    let min_notional = fields.min_notional.unwrap_or(LegacyDec::ZERO);
    if min_notional.is_negative() {
        return Err(SubmitterError::InvalidProposal(
            "min notional must not be negative".to_string(),
        ));
    }

    let proposal = ProposalMessage {
        title: fields.title.clone(),
        description: fields.description.clone(),
        ticker: fields.ticker.clone(),
        base_denom: fields.base_denom.clone(),
        quote_denom: fields.quote_denom.clone(),
        maker_fee_rate: fields.maker_fee_rate,
        taker_fee_rate: fields.taker_fee_rate,
        min_price_tick_size,
        min_quantity_tick_size,
        min_notional,
    };

    debug!(
        "Built proposal {} (maker {}, taker {}, price tick {}, quantity tick {})",
        proposal.ticker,
        proposal.maker_fee_rate,
        proposal.taker_fee_rate,
        proposal.min_price_tick_size,
        proposal.min_quantity_tick_size
    );

    Ok(proposal)
}

fn token_decimals(name: &str, decimals: u32) -> SubmitterResult<i32> {
    if decimals > decimal::PRECISION {
        return Err(SubmitterError::InvalidProposal(format!(
            "{} {} exceeds {}",
            name,
            decimals,
            decimal::PRECISION
        )));
    }
    Ok(decimals as i32)
}

impl ProposalMessage {
    /// Protobuf form with decimals in their 18-place wire encoding
    pub fn to_proto(&self) -> SpotMarketLaunchProposal {
        SpotMarketLaunchProposal {
            title: self.title.clone(),
            description: self.description.clone(),
            ticker: self.ticker.clone(),
            base_denom: self.base_denom.clone(),
            quote_denom: self.quote_denom.clone(),
            min_price_tick_size: self.min_price_tick_size.to_wire(),
            min_quantity_tick_size: self.min_quantity_tick_size.to_wire(),
            maker_fee_rate: self.maker_fee_rate.to_wire(),
            taker_fee_rate: self.taker_fee_rate.to_wire(),
            min_notional: self.min_notional.to_wire(),
        }
    }

    /// Proposal content packed as `Any`
    pub fn to_any(&self) -> Any {
        Any {
            type_url: SPOT_MARKET_LAUNCH_PROPOSAL_TYPE_URL.to_string(),
            value: self.to_proto().encode_to_vec(),
        }
    }

    /// Wrap the proposal in a gov `MsgSubmitProposal` signed by `proposer`
    pub fn to_submit_msg(&self, proposer: &str, deposit: &DepositConfig) -> Any {
        let msg = MsgSubmitProposal {
            content: Some(self.to_any()),
            initial_deposit: vec![Coin {
                denom: deposit.denom.clone(),
                amount: deposit.amount.clone(),
            }],
            proposer: proposer.to_string(),
        };

        Any {
            type_url: MSG_SUBMIT_PROPOSAL_TYPE_URL.to_string(),
            value: msg.encode_to_vec(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_fields() -> ProposalConfig {
    crate::config::Settings::from_toml_str(crate::config::SAMPLE_CONFIG)
        .expect("sample config parses")
        .proposal
}
