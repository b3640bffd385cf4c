use crate::{
    balance::{BalanceState, BalanceSync},
    contract::{ContractBinding, WriteCall},
    error::WalletError,
};
use lir_common::{provider::MaybeSendSync, rpc::TransactionReceipt};
use log::{debug, error, info, trace};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

// Caller visible "pending" flag
// It is set as long as at least one guard is alive
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicUsize>);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }

    pub fn acquire(&self) -> BusyGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        BusyGuard(Arc::clone(&self.0))
    }
}

// Releases the busy flag when dropped, whatever the outcome was
pub struct BusyGuard(Arc<AtomicUsize>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// Where the outcome of a transaction is reported to the user
pub trait Notifier: MaybeSendSync {
    fn success(&self, message: &str);

    fn failure(&self, message: &str);
}

// Report the outcomes in the logs only
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        info!("{}", message);
    }

    fn failure(&self, message: &str) {
        error!("{}", message);
    }
}

// A confirmed transaction and the balances fetched right after it
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub receipt: TransactionReceipt,
    // None if the refresh failed, the transaction is still confirmed
    pub balances: Option<BalanceState>,
}

pub struct TransactionPipeline {
    busy: BusyFlag,
    notifier: Arc<dyn Notifier>,
}

impl TransactionPipeline {
    pub fn new(busy: BusyFlag, notifier: Arc<dyn Notifier>) -> Self {
        Self { busy, notifier }
    }

    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    // Report a call refused before reaching the contract
    pub fn reject(&self, call: &WriteCall, error: WalletError) -> WalletError {
        if log::log_enabled!(log::Level::Debug) {
            debug!("{} rejected: {:?}", call.name(), error);
        }
        self.notifier.failure(&format!("Error: {}", error.user_message()));
        error
    }

    // Execute a write call, wait for its inclusion and refresh the balances
    // Nothing is retried, a failure is reported and returned to the caller
    pub async fn submit(
        &self,
        contract: Option<&ContractBinding>,
        call: &WriteCall,
        success_message: &str,
    ) -> Result<Confirmation, WalletError> {
        let contract = contract.ok_or(WalletError::NotConnected)?;
        trace!("submit {}", call.name());

        let _guard = self.busy.acquire();
        let result = async {
            let pending = contract.execute(call).await?;
            pending.wait().await
        }
        .await;

        match result {
            Ok(receipt) => {
                self.notifier.success(success_message);

                let account = contract.signer().address();
                let balances = match BalanceSync::refresh(contract, account).await {
                    Ok(balances) => Some(balances),
                    Err(e) => {
                        if log::log_enabled!(log::Level::Error) {
                            error!("Error updating balances: {}", e);
                        }
                        None
                    }
                };

                if log::log_enabled!(log::Level::Debug) {
                    debug!("{} confirmed in {}", call.name(), receipt.transaction_hash);
                }
                Ok(Confirmation { receipt, balances })
            }
            Err(e) => {
                if log::log_enabled!(log::Level::Debug) {
                    debug!("{} failed: {:?}", call.name(), e);
                }
                self.notifier.failure(&format!("Error: {}", e.user_message()));
                Err(e)
            }
        }
    }
}
