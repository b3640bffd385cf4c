use lir_common::rpc::ProviderError;
use thiserror::Error;

fn reverted_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        None => String::new(),
    }
}

// Every failure the session can report to the user
// Chain and provider failures are converted at the boundary where they happen
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    // No injected provider, the user has to install a wallet extension
    #[error("No wallet provider found, please install MetaMask")]
    NoWallet,
    #[error("User rejected the request")]
    UserRejected,
    #[error("No accounts found")]
    NoAccounts,
    // Local validation failure, never reaches the network
    #[error("Invalid argument: {}", _0)]
    InvalidArgument(String),
    #[error("Execution reverted{}", reverted_suffix(.0))]
    ExecutionReverted(Option<String>),
    #[error("Network error: {}", _0)]
    Network(String),
    // An action was attempted while the session is not connected
    #[error("Wallet is not connected")]
    NotConnected,
}

impl WalletError {
    // Message displayed to the user, the revert reason is preferred when available
    pub fn user_message(&self) -> String {
        match self {
            Self::ExecutionReverted(Some(reason)) => reason.clone(),
            Self::InvalidArgument(reason) => reason.clone(),
            _ => self.to_string(),
        }
    }

    // Can the user simply retry the same action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UserRejected | Self::NoAccounts | Self::Network(_)
        )
    }
}

impl From<ProviderError> for WalletError {
    fn from(error: ProviderError) -> Self {
        if error.is_user_rejected() {
            Self::UserRejected
        } else if error.is_reverted() {
            Self::ExecutionReverted(error.revert_reason())
        } else {
            Self::Network(error.to_string())
        }
    }
}

// The contract returned something we can't decode
impl From<alloy_sol_types::Error> for WalletError {
    fn from(error: alloy_sol_types::Error) -> Self {
        Self::Network(format!("Invalid contract response: {}", error))
    }
}
