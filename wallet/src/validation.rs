//! Client side checks of the user inputs
//!
//! Every write call goes through these functions before anything is sent to
//! the wallet, so an invalid input never reaches the network.

use crate::{config::TOKEN_SYMBOL, error::WalletError};
use alloy_primitives::Address;
use lir_common::{address, amount::{from_coin, TokenAmount}};
use log::debug;

pub const INVALID_ADDRESS_MESSAGE: &str = "Please enter a valid Ethereum address";
pub const INVALID_AMOUNT_MESSAGE: &str = "Please enter a valid amount";

// Parse a 20 bytes hex address, the checksum is verified for mixed-case inputs
pub fn parse_address(value: &str) -> Result<Address, WalletError> {
    address::parse_address(value).map_err(|e| {
        if log::log_enabled!(log::Level::Debug) {
            debug!("rejected address '{}': {}", value, e);
        }
        WalletError::InvalidArgument(INVALID_ADDRESS_MESSAGE.to_owned())
    })
}

// Parse a decimal token amount, it must be strictly positive
pub fn parse_positive_amount(value: &str) -> Result<TokenAmount, WalletError> {
    let amount = from_coin(value).map(TokenAmount::new).map_err(|e| {
        if log::log_enabled!(log::Level::Debug) {
            debug!("rejected amount '{}': {}", value, e);
        }
        WalletError::InvalidArgument(INVALID_AMOUNT_MESSAGE.to_owned())
    })?;

    if amount.is_zero() {
        return Err(WalletError::InvalidArgument(INVALID_AMOUNT_MESSAGE.to_owned()));
    }

    Ok(amount)
}

// A burn can't exceed the last known balance of the account
pub fn check_burn_amount(amount: TokenAmount, balance: TokenAmount) -> Result<(), WalletError> {
    if amount > balance {
        return Err(WalletError::InvalidArgument(format!(
            "You cannot burn more than your balance ({} {})",
            balance, TOKEN_SYMBOL
        )));
    }

    Ok(())
}
