//! Typed binding of the LIR token contract
//!
//! Read calls are sent with `eth_call` and decoded with the `sol!` bindings.
//! Write calls are validated locally, encoded and handed to the wallet with
//! `eth_sendTransaction`. They return a [`PendingTransaction`] that can be
//! awaited until the transaction is included in a block.

use crate::{
    connection::Signer,
    error::WalletError,
    validation::{parse_address, parse_positive_amount},
};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_sol_types::SolCall;
use lir_common::{
    amount::TokenAmount,
    config::TOKEN_SYMBOL,
    provider::{request_typed, SharedProvider},
    rpc::{BlockTag, TransactionReceipt},
    token::ILirToken,
    tokio::sleep,
};
use log::{debug, trace, warn};
use serde_json::json;
use std::{fmt, time::Duration};

pub use lir_common::rpc::TransactionRequest;

// One state changing call of the contract, as entered by the user
// Inputs are kept as typed by the user and only validated when executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    SetManager { manager: String, status: bool },
    DistributeToManager { manager: String, amount: String },
    RewardStudent { student: String, amount: String },
    BurnTokens { amount: String },
}

impl WriteCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetManager { .. } => "setManager",
            Self::DistributeToManager { .. } => "distributeToManager",
            Self::RewardStudent { .. } => "rewardStudent",
            Self::BurnTokens { .. } => "burnTokens",
        }
    }

    // Message shown to the user once the transaction is confirmed
    pub fn default_message(&self) -> String {
        match self {
            Self::SetManager { manager, status } => {
                format!("Manager {} status set to {}", manager, status)
            }
            Self::DistributeToManager { manager, amount } => {
                format!("Distributed {} {} to manager {}", amount, TOKEN_SYMBOL, manager)
            }
            Self::RewardStudent { student, amount } => {
                format!("Rewarded {} {} to student {}", amount, TOKEN_SYMBOL, student)
            }
            Self::BurnTokens { amount } => format!("Burned {} {} tokens", amount, TOKEN_SYMBOL),
        }
    }
}

// A transaction accepted by the wallet but not yet included
pub struct PendingTransaction {
    hash: TxHash,
    provider: SharedProvider,
    poll_interval: Duration,
}

impl fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("hash", &self.hash)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl PendingTransaction {
    pub fn hash(&self) -> &TxHash {
        &self.hash
    }

    // Poll the receipt until the transaction is included
    // There is no timeout, a transaction never mined keeps this future pending
    pub async fn wait(self) -> Result<TransactionReceipt, WalletError> {
        trace!("waiting for transaction {}", self.hash);
        loop {
            let receipt: Option<TransactionReceipt> = request_typed(
                self.provider.as_ref(),
                "eth_getTransactionReceipt",
                json!([self.hash]),
            )
            .await?;

            if let Some(receipt) = receipt {
                if !receipt.is_success() {
                    if log::log_enabled!(log::Level::Warn) {
                        warn!("transaction {} reverted", self.hash);
                    }
                    return Err(WalletError::ExecutionReverted(None));
                }

                if log::log_enabled!(log::Level::Debug) {
                    debug!("transaction {} confirmed", self.hash);
                }
                return Ok(receipt);
            }

            sleep(self.poll_interval).await;
        }
    }
}

// The LIR contract bound to the signer of the connected account
#[derive(Clone, Debug)]
pub struct ContractBinding {
    address: Address,
    signer: Signer,
    receipt_poll_interval: Duration,
}

impl ContractBinding {
    pub fn new(address: Address, signer: Signer, receipt_poll_interval: Duration) -> Self {
        Self {
            address,
            signer,
            receipt_poll_interval,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn provider(&self) -> &SharedProvider {
        self.signer.provider()
    }

    async fn call<C: SolCall>(&self, call: C) -> Result<C::Return, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("eth_call {} on {}", C::SIGNATURE, self.address);
        }

        let request = TransactionRequest {
            from: Some(*self.signer.address()),
            to: self.address,
            data: call.abi_encode().into(),
        };
        let output: Bytes = request_typed(
            self.provider().as_ref(),
            "eth_call",
            json!([request, BlockTag::Latest]),
        )
        .await?;

        Ok(C::abi_decode_returns(&output, true)?)
    }

    async fn send<C: SolCall>(&self, call: C) -> Result<PendingTransaction, WalletError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("sending {} to {}", C::SIGNATURE, self.address);
        }

        let hash = self
            .signer
            .send_transaction(self.address, call.abi_encode().into())
            .await?;

        Ok(PendingTransaction {
            hash,
            provider: self.provider().clone(),
            poll_interval: self.receipt_poll_interval,
        })
    }

    pub async fn admin(&self) -> Result<Address, WalletError> {
        Ok(self.call(ILirToken::adminCall {}).await?._0)
    }

    pub async fn is_manager(&self, account: &Address) -> Result<bool, WalletError> {
        let call = ILirToken::managersCall { account: *account };
        Ok(self.call(call).await?._0)
    }

    pub async fn balance_of(&self, account: &Address) -> Result<TokenAmount, WalletError> {
        let call = ILirToken::balanceOfCall { account: *account };
        Ok(TokenAmount::new(self.call(call).await?._0))
    }

    pub async fn set_manager(&self, manager: &str, status: bool) -> Result<PendingTransaction, WalletError> {
        let manager = parse_address(manager)?;
        self.send(ILirToken::setManagerCall { manager, status })
            .await
    }

    pub async fn distribute_to_manager(&self, manager: &str, amount: &str) -> Result<PendingTransaction, WalletError> {
        let manager = parse_address(manager)?;
        let amount = parse_positive_amount(amount)?.raw();
        self.send(ILirToken::distributeToManagerCall { manager, amount })
            .await
    }

    pub async fn reward_student(&self, student: &str, amount: &str) -> Result<PendingTransaction, WalletError> {
        let student = parse_address(student)?;
        let amount = parse_positive_amount(amount)?.raw();
        self.send(ILirToken::rewardStudentCall { student, amount })
            .await
    }

    pub async fn burn_tokens(&self, amount: &str) -> Result<PendingTransaction, WalletError> {
        let amount = parse_positive_amount(amount)?.raw();
        self.send(ILirToken::burnTokensCall { amount }).await
    }

    // Dispatch a write call to its contract method
    pub async fn execute(&self, call: &WriteCall) -> Result<PendingTransaction, WalletError> {
        match call {
            WriteCall::SetManager { manager, status } => self.set_manager(manager, *status).await,
            WriteCall::DistributeToManager { manager, amount } => {
                self.distribute_to_manager(manager, amount).await
            }
            WriteCall::RewardStudent { student, amount } => {
                self.reward_student(student, amount).await
            }
            WriteCall::BurnTokens { amount } => self.burn_tokens(amount).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChain;

    fn bind(chain: &std::sync::Arc<MockChain>, account: Address) -> ContractBinding {
        let signer = Signer::new(chain.clone(), account);
        ContractBinding::new(chain.contract(), signer, Duration::from_millis(10))
    }

    #[test]
    fn test_default_messages() {
        let call = WriteCall::SetManager {
            manager: "0xabc".into(),
            status: true,
        };
        assert_eq!(call.default_message(), "Manager 0xabc status set to true");

        let call = WriteCall::DistributeToManager {
            manager: "0xabc".into(),
            amount: "50".into(),
        };
        assert_eq!(call.default_message(), "Distributed 50 LIR to manager 0xabc");

        let call = WriteCall::RewardStudent {
            student: "0xdef".into(),
            amount: "1.5".into(),
        };
        assert_eq!(call.default_message(), "Rewarded 1.5 LIR to student 0xdef");

        let call = WriteCall::BurnTokens { amount: "2".into() };
        assert_eq!(call.default_message(), "Burned 2 LIR tokens");
        assert_eq!(call.name(), "burnTokens");
    }

    #[tokio::test]
    async fn test_reads() {
        let chain = MockChain::new();
        let contract = bind(&chain, chain.admin());

        assert_eq!(contract.admin().await.unwrap(), chain.admin());
        assert!(!contract.is_manager(&chain.admin()).await.unwrap());
        assert_eq!(
            contract.balance_of(&chain.contract()).await.unwrap(),
            chain.balance(&chain.contract())
        );
    }

    #[tokio::test]
    async fn test_write_and_wait() {
        let chain = MockChain::new();
        let contract = bind(&chain, chain.admin());
        let manager = MockChain::account(2);

        let pending = contract
            .set_manager(&manager.to_checksum(None), true)
            .await
            .unwrap();
        assert!(format!("{:?}", pending).contains(&format!("{:#x}", pending.hash())));
        let receipt = pending.wait().await.unwrap();
        assert!(receipt.is_success());
        assert!(contract.is_manager(&manager).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_the_wallet() {
        let chain = MockChain::new();
        let contract = bind(&chain, chain.admin());

        let error = contract.set_manager("0xnot-an-address", true).await.unwrap_err();
        assert!(matches!(error, WalletError::InvalidArgument(_)));
        let error = contract.burn_tokens("0").await.unwrap_err();
        assert!(matches!(error, WalletError::InvalidArgument(_)));
        let error = contract
            .distribute_to_manager(&format!("{:#x}", MockChain::account(2)), "-5")
            .await
            .unwrap_err();
        assert!(matches!(error, WalletError::InvalidArgument(_)));

        assert_eq!(chain.count_requests("eth_sendTransaction"), 0);
    }

    #[tokio::test]
    async fn test_revert_reason_is_surfaced() {
        let chain = MockChain::new();
        // Not the admin
        let contract = bind(&chain, MockChain::account(3));
        let error = contract
            .set_manager(&format!("{:#x}", MockChain::account(2)), true)
            .await
            .unwrap_err();
        assert_eq!(
            error,
            WalletError::ExecutionReverted(Some("Only admin can call this".into()))
        );
    }

    #[tokio::test]
    async fn test_failed_receipt_is_reverted() {
        let chain = MockChain::new();
        chain.fail_receipts(true);
        let contract = bind(&chain, chain.admin());
        let pending = contract.burn_tokens("1").await.unwrap();
        assert_eq!(pending.wait().await.unwrap_err(), WalletError::ExecutionReverted(None));
    }
}
