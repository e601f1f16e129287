//! Gas limit and fee computation

use crate::config::GasConfig;

use rust_decimal::Decimal;
use std::fmt;
use tracing::debug;

/// Token amount in atomic units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub atomic: u128,
    pub denom: String,
    /// Decimal places between the atomic and display unit
    pub decimals: u32,
}

impl Amount {
    pub fn new(atomic: u128, denom: &str, decimals: u32) -> Self {
        Self {
            atomic,
            denom: denom.to_string(),
            decimals,
        }
    }

    /// Value in display units, `None` if it does not fit a decimal
    pub fn to_decimal(&self) -> Option<Decimal> {
        let atomic = i128::try_from(self.atomic).ok()?;
        Decimal::try_from_i128_with_scale(atomic, self.decimals)
            .ok()
            .map(|d| d.normalize())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(value) => write!(f, "{} {}", value, self.denom.to_uppercase()),
            None => write!(f, "{} {}", self.atomic, self.denom),
        }
    }
}

/// Gas estimator for transactions
#[derive(Debug, Clone)]
pub struct GasEstimator {
    /// Added on top of simulated usage
    gas_limit_buffer: u64,
    /// Price per gas unit in atomic fee units
    gas_price: u64,
    /// Limit used when no simulation result is available
    default_limit: u64,
}

impl GasEstimator {
    pub fn new(config: &GasConfig) -> Self {
        Self {
            gas_limit_buffer: config.limit_buffer,
            gas_price: config.price,
            default_limit: config.default_limit,
        }
    }

    /// Gas limit for a tx, from simulated usage when available
    pub fn gas_limit(&self, simulated_gas_used: Option<u64>) -> u64 {
        let limit = match simulated_gas_used {
            Some(used) => used.saturating_add(self.gas_limit_buffer),
            None => self.default_limit,
        };
        debug!(
            "Gas limit {} (simulated {:?}, buffer {})",
            limit, simulated_gas_used, self.gas_limit_buffer
        );
        limit
    }

    /// Fee for a gas limit at the configured price
    pub fn fee(&self, gas_limit: u64, denom: &str, decimals: u32) -> Amount {
        Amount::new(Self::calculate_cost(gas_limit, self.gas_price), denom, decimals)
    }

    /// Total cost in atomic units
    pub fn calculate_cost(gas_limit: u64, gas_price: u64) -> u128 {
        u128::from(gas_limit) * u128::from(gas_price)
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new(&GasConfig::default())
    }
}
