//! Fixed-point token amounts.
//!
//! Balances and prices are carried as integer base units plus a decimals
//! scale (USDC uses 6), so comparisons never go through floating point.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest scale we accept; `10^19` no longer fits in a `u64`.
const MAX_DECIMALS: u8 = 18;

/// Errors produced when parsing or rescaling an amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The input string is not a non-negative decimal number.
    #[error("invalid amount: {0:?}")]
    Invalid(String),

    /// The input has more fractional digits than the token supports.
    #[error("amount {input:?} has more than {decimals} decimal places")]
    TooPrecise {
        /// Original input
        input: String,
        /// Token scale
        decimals: u8,
    },

    /// The value does not fit in 64 bits of base units.
    #[error("amount overflows at {decimals} decimals")]
    Overflow {
        /// Token scale
        decimals: u8,
    },
}

/// A non-negative token amount in base units with a decimals scale.
///
/// Equality and ordering compare the represented value, so `0.1` at 6
/// decimals equals `0.10` at 2 decimals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenAmount {
    units: u64,
    decimals: u8,
}

impl TokenAmount {
    /// Create an amount from raw base units.
    pub fn from_units(units: u64, decimals: u8) -> Self {
        Self {
            units,
            decimals: decimals.min(MAX_DECIMALS),
        }
    }

    /// Zero at the given scale.
    pub fn zero(decimals: u8) -> Self {
        Self::from_units(0, decimals)
    }

    /// Parse a decimal string such as `"0.1"` or `"12"` at the given scale.
    pub fn parse(input: &str, decimals: u8) -> Result<Self, AmountError> {
        let decimals = decimals.min(MAX_DECIMALS);
        let trimmed = input.trim();
        let (whole, frac) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
            return Err(AmountError::Invalid(input.to_string()));
        }

        let frac = frac.trim_end_matches('0');
        if frac.len() > decimals as usize {
            return Err(AmountError::TooPrecise {
                input: input.to_string(),
                decimals,
            });
        }

        let overflow = || AmountError::Overflow { decimals };
        let scale = 10u64.checked_pow(u32::from(decimals)).ok_or_else(overflow)?;
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u64>()
                .map_err(|_| overflow())?
                .checked_mul(scale)
                .ok_or_else(overflow)?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padding = 10u64.pow((decimals as usize - frac.len()) as u32);
            frac.parse::<u64>().map_err(|_| overflow())? * padding
        };

        Ok(Self {
            units: whole_units.checked_add(frac_units).ok_or_else(overflow)?,
            decimals,
        })
    }

    /// Raw base units.
    pub fn units(&self) -> u64 {
        self.units
    }

    /// Decimals scale.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.units == 0
    }

    /// Re-express the amount at another scale.
    ///
    /// Fails when scaling down would drop non-zero digits or scaling up
    /// would overflow.
    pub fn rescale(&self, decimals: u8) -> Result<Self, AmountError> {
        let decimals = decimals.min(MAX_DECIMALS);
        match decimals.cmp(&self.decimals) {
            Ordering::Equal => Ok(*self),
            Ordering::Greater => {
                let factor = 10u64.pow(u32::from(decimals - self.decimals));
                let units = self
                    .units
                    .checked_mul(factor)
                    .ok_or(AmountError::Overflow { decimals })?;
                Ok(Self { units, decimals })
            }
            Ordering::Less => {
                let factor = 10u64.pow(u32::from(self.decimals - decimals));
                if self.units % factor != 0 {
                    return Err(AmountError::TooPrecise {
                        input: self.to_string(),
                        decimals,
                    });
                }
                Ok(Self {
                    units: self.units / factor,
                    decimals,
                })
            }
        }
    }

    /// Format with exactly `places` fractional digits, rounding half up.
    pub fn to_fixed(&self, places: u8) -> String {
        let places = places.min(MAX_DECIMALS);
        let value = u128::from(self.units);
        let scaled = if places >= self.decimals {
            value * 10u128.pow(u32::from(places - self.decimals))
        } else {
            let factor = 10u128.pow(u32::from(self.decimals - places));
            (value + factor / 2) / factor
        };

        if places == 0 {
            return scaled.to_string();
        }
        let divisor = 10u128.pow(u32::from(places));
        format!(
            "{}.{:0width$}",
            scaled / divisor,
            scaled % divisor,
            width = places as usize
        )
    }

    fn normalized(&self) -> u128 {
        u128::from(self.units) * 10u128.pow(u32::from(MAX_DECIMALS.saturating_sub(self.decimals)))
    }
}

/// Shortest exact representation: `0.1`, `5`, `0.05`.
impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = self.to_fixed(self.decimals);
        let shortest = if fixed.contains('.') {
            fixed.trim_end_matches('0').trim_end_matches('.')
        } else {
            fixed.as_str()
        };
        f.write_str(shortest)
    }
}

impl PartialEq for TokenAmount {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for TokenAmount {}

impl PartialOrd for TokenAmount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenAmount {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}
