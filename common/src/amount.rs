//! Exact conversion between human readable decimal strings and the
//! fixed-point integers stored by the token contract.
//!
//! A token amount is an unsigned 256 bits integer scaled by `10^18`.
//! The scaling itself is done by `alloy_primitives::utils`, which truncates
//! extra fractional digits: inputs are validated first so nothing is lost.

use crate::config::{COIN_DECIMALS, COIN_VALUE};
use alloy_primitives::{
    utils::{format_units, parse_units},
    U256,
};
use serde::{de::Error as SerdeError, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,
    #[error("Invalid character '{}' in amount", _0)]
    InvalidCharacter(char),
    #[error("Amount has more than one decimal separator")]
    MultipleSeparators,
    #[error("Amount has {found} decimals, maximum is {max}")]
    TooManyDecimals { found: usize, max: u8 },
    #[error("Amount is too big")]
    Overflow,
}

// Check the input and rewrite it as "integer.fraction" without insignificant zeros
fn normalize(value: &str) -> Result<String, AmountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AmountError::Empty);
    }

    if let Some(c) = value.chars().find(|c| !c.is_ascii_digit() && *c != '.') {
        return Err(AmountError::InvalidCharacter(c));
    }

    let (integer, fraction) = match value.split_once('.') {
        Some((_, rest)) if rest.contains('.') => return Err(AmountError::MultipleSeparators),
        Some((integer, fraction)) => (integer, fraction),
        None => (value, ""),
    };

    // "." alone carries no digit at all
    if integer.is_empty() && fraction.is_empty() {
        return Err(AmountError::Empty);
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > COIN_DECIMALS as usize {
        return Err(AmountError::TooManyDecimals {
            found: fraction.len(),
            max: COIN_DECIMALS,
        });
    }

    let integer = if integer.is_empty() { "0" } else { integer };
    let fraction = if fraction.is_empty() { "0" } else { fraction };
    Ok(format!("{}.{}", integer, fraction))
}

// Parse an amount of LIR such as "12.5" into its smallest unit
// Extra fractional digits are accepted only if they are zeros
pub fn from_coin(value: &str) -> Result<U256, AmountError> {
    let normalized = normalize(value)?;
    parse_units(&normalized, COIN_DECIMALS)
        .map(|units| units.get_absolute())
        .map_err(|_| AmountError::Overflow)
}

// Format an amount of LIR
// Trailing zeros of the fraction are removed, but one digit is always kept: 50 => "50.0"
pub fn format_coin(value: U256) -> String {
    let formatted = match format_units(value, COIN_DECIMALS) {
        Ok(formatted) => formatted,
        Err(_) => return value.to_string(),
    };

    match formatted.split_once('.') {
        Some((integer, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            let fraction = if fraction.is_empty() { "0" } else { fraction };
            format!("{}.{}", integer, fraction)
        }
        None => format!("{}.0", formatted),
    }
}

// Token amount in its smallest unit
// Displayed and serialized as a decimal string with the token decimals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(U256);

impl TokenAmount {
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    pub const fn zero() -> Self {
        Self(U256::ZERO)
    }

    // Whole tokens, mostly useful in tests and fixtures
    pub fn from_coins(coins: u64) -> Self {
        Self(U256::from(coins).saturating_mul(*COIN_VALUE))
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_coin(s).map(Self)
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_coin(self.0))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'a> Deserialize<'a> for TokenAmount {
    fn deserialize<D: Deserializer<'a>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        TokenAmount::from_str(&value).map_err(SerdeError::custom)
    }
}
