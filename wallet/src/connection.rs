use crate::error::WalletError;
use alloy_primitives::{Address, Bytes, TxHash};
use lir_common::{
    provider::{request_typed, SharedProvider},
    rpc::TransactionRequest,
};
use log::{debug, trace};
use serde_json::json;
use std::fmt;

// Capability to sign and send transactions on behalf of the connected account
// The keys never leave the wallet, the signer only asks it through the provider
#[derive(Clone)]
pub struct Signer {
    provider: SharedProvider,
    account: Address,
}

impl Signer {
    pub fn new(provider: SharedProvider, account: Address) -> Self {
        Self { provider, account }
    }

    pub fn address(&self) -> &Address {
        &self.account
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    // Ask the wallet to sign and broadcast a transaction from our account
    // Returns the transaction hash once the user approved it
    pub async fn send_transaction(&self, to: Address, data: Bytes) -> Result<TxHash, WalletError> {
        trace!("send transaction to {}", to);
        let request = TransactionRequest {
            from: Some(self.account),
            to,
            data,
        };

        let hash: TxHash =
            request_typed(self.provider.as_ref(), "eth_sendTransaction", json!([request])).await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!("transaction {} sent by {}", hash, self.account);
        }

        Ok(hash)
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("account", &self.account).finish()
    }
}

// Access to the wallet extension
// No provider means no wallet extension is installed
#[derive(Clone)]
pub struct ChainConnection {
    provider: Option<SharedProvider>,
}

impl ChainConnection {
    pub fn new(provider: Option<SharedProvider>) -> Self {
        Self { provider }
    }

    pub fn with_provider(provider: SharedProvider) -> Self {
        Self::new(Some(provider))
    }

    // Is a wallet provider available at all
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Result<&SharedProvider, WalletError> {
        self.provider.as_ref().ok_or(WalletError::NoWallet)
    }

    // Request access to the accounts, this may open a permission prompt in the wallet
    pub async fn connect(&self) -> Result<(Address, Signer), WalletError> {
        trace!("connect");
        let provider = self.provider()?;
        let accounts: Vec<Address> =
            request_typed(provider.as_ref(), "eth_requestAccounts", json!([])).await?;

        let account = accounts.first().copied().ok_or(WalletError::NoAccounts)?;
        if log::log_enabled!(log::Level::Debug) {
            debug!("connected with account {} ({} available)", account, accounts.len());
        }

        Ok((account, Signer::new(provider.clone(), account)))
    }

    // Check without any prompt if an account was already authorized
    pub async fn check_existing(&self) -> Result<Option<Address>, WalletError> {
        trace!("check existing");
        let provider = self.provider()?;
        let accounts: Vec<Address> =
            request_typed(provider.as_ref(), "eth_accounts", json!([])).await?;

        Ok(accounts.first().copied())
    }
}
