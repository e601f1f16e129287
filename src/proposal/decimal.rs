//! Exact 18-place fixed-point decimals
//!
//! Fee rates and tick sizes are carried as `LegacyDec`, the chain's decimal
//! representation. Values are parsed from strings only and never pass through
//! binary floating point. On the wire a decimal is its value scaled by 10^18,
//! written as a base-10 integer string.
//!
//! The scaled value is held in a signed 256-bit integer, wide enough for any
//! amount the chain accepts in a market parameter.

use crate::error::{SubmitterError, SubmitterResult};

use ethers::types::I256;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits carried by the chain
pub const PRECISION: u32 = 18;

/// Exact fixed-point decimal with at most 18 fractional digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct LegacyDec(I256);

fn invalid(message: String) -> SubmitterError {
    SubmitterError::InvalidProposal(message)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl LegacyDec {
    pub const ZERO: LegacyDec = LegacyDec(I256::zero());

    /// Decode the wire form (value scaled by 10^18)
    pub fn from_wire(atomic: &str) -> SubmitterResult<Self> {
        let atomic = atomic.trim();
        let digits = atomic.strip_prefix('-').unwrap_or(atomic);
        if !is_digits(digits) {
            return Err(invalid(format!("invalid decimal wire value {:?}", atomic)));
        }
        I256::from_dec_str(atomic)
            .map(Self)
            .map_err(|e| invalid(format!("decimal wire value {} out of range: {}", atomic, e)))
    }

    /// Encode to the wire form (value scaled by 10^18)
    pub fn to_wire(&self) -> String {
        self.0.to_string()
    }

    /// Multiply by 10^exp, exactly
    pub fn shift(&self, exp: i32) -> SubmitterResult<Self> {
        if exp.unsigned_abs() > PRECISION {
            return Err(invalid(format!("decimal shift 10^{} out of range", exp)));
        }
        let pow = I256::exp10(exp.unsigned_abs() as usize);

        if exp >= 0 {
            return self
                .0
                .checked_mul(pow)
                .map(Self)
                .ok_or_else(|| invalid(format!("{} shifted by 10^{} overflows", self, exp)));
        }

        if self.0.checked_rem(pow) != Some(I256::zero()) {
            return Err(invalid(format!(
                "{} shifted by 10^{} needs more than {} decimal places",
                self, exp, PRECISION
            )));
        }
        self.0
            .checked_div(pow)
            .map(Self)
            .ok_or_else(|| invalid(format!("{} shifted by 10^{} overflows", self, exp)))
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
}

impl FromStr for LegacyDec {
    type Err = SubmitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) if is_digits(fraction) => (whole, fraction),
            Some(_) => return Err(invalid(format!("invalid decimal {:?}", s))),
            None => (unsigned, ""),
        };

        if !is_digits(whole) {
            return Err(invalid(format!("invalid decimal {:?}", s)));
        }

        // zeros past the 18th place carry no information
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > PRECISION as usize {
            return Err(invalid(format!(
                "{} has more than {} decimal places",
                trimmed, PRECISION
            )));
        }

        let scaled = format!(
            "{}{}{:0<width$}",
            if negative { "-" } else { "" },
            whole,
            fraction,
            width = PRECISION as usize
        );
        I256::from_dec_str(&scaled)
            .map(Self)
            .map_err(|e| invalid(format!("decimal {} out of range: {}", trimmed, e)))
    }
}

impl TryFrom<String> for LegacyDec {
    type Error = SubmitterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for LegacyDec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = format!(
            "{:0>width$}",
            self.0.unsigned_abs().to_string(),
            width = PRECISION as usize + 1
        );
        let (whole, fraction) = digits.split_at(digits.len() - PRECISION as usize);
        let fraction = fraction.trim_end_matches('0');

        if self.0.is_negative() {
            write!(f, "-")?;
        }
        if fraction.is_empty() {
            write!(f, "{}", whole)
        } else {
            write!(f, "{}.{}", whole, fraction)
        }
    }
}
