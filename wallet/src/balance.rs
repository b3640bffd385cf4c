use crate::{contract::ContractBinding, error::WalletError};
use alloy_primitives::Address;
use lir_common::amount::TokenAmount;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

// Last known balances, displayed as decimal strings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceState {
    pub user_balance: TokenAmount,
    pub contract_balance: TokenAmount,
}

pub struct BalanceSync;

impl BalanceSync {
    // Fetch the balance of the account and the one of the contract at the same time
    // Nothing is returned unless both succeeded
    pub async fn refresh(contract: &ContractBinding, account: &Address) -> Result<BalanceState, WalletError> {
        trace!("refresh balances of {}", account);
        let (user_balance, contract_balance) = futures::try_join!(
            contract.balance_of(account),
            contract.balance_of(contract.address())
        )?;

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "balances: user {} contract {}",
                user_balance, contract_balance
            );
        }

        Ok(BalanceState {
            user_balance,
            contract_balance,
        })
    }
}
