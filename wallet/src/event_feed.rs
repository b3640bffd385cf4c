//! Live feed of the contract transfers
//!
//! The feed subscribes to the `Transfer` logs of the contract and appends
//! every notification to a bounded [`EventLog`]. It is only used for display,
//! balances and roles are never recomputed from it.
//!
//! The subscription lives as long as its [`SubscriptionHandle`]: cancelling
//! the handle stops the background task and unsubscribes from the provider,
//! dropping it stops the task and releases the subscription without waiting.

use crate::{config::TOKEN_SYMBOL, contract::ContractBinding, error::WalletError};
use alloy_primitives::{Address, TxHash, B256};
use alloy_sol_types::SolEvent;
use futures::{
    channel::mpsc::UnboundedReceiver,
    future::{AbortHandle, Abortable},
    StreamExt,
};
use lir_common::{
    address::shorten_address,
    amount::TokenAmount,
    provider::SharedProvider,
    rpc::{LogFilter, RpcLog},
    time::{format_local_time, get_current_time_in_millis, TimestampMillis},
    token::Transfer,
    tokio::{spawn_task, sync::Mutex},
};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferLogError {
    #[error("Log has no topic")]
    MissingTopic,
    #[error("Unexpected event topic {}", _0)]
    UnexpectedTopic(B256),
    #[error("Invalid transfer log: {}", _0)]
    Decode(#[from] alloy_sol_types::Error),
}

// A transfer observed on the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub value: TokenAmount,
    pub tx_hash: Option<TxHash>,
    // Local time of arrival, not the block time
    pub observed_at: TimestampMillis,
}

impl TransferEvent {
    // Decode a `Transfer(address indexed, address indexed, uint256)` log
    pub fn from_log(log: &RpcLog, observed_at: TimestampMillis) -> Result<Self, TransferLogError> {
        let topic = log.topics.first().ok_or(TransferLogError::MissingTopic)?;
        if *topic != Transfer::SIGNATURE_HASH {
            return Err(TransferLogError::UnexpectedTopic(*topic));
        }

        let transfer = Transfer::decode_raw_log(log.topics.iter().copied(), &log.data, true)?;
        Ok(Self {
            from: transfer.from,
            to: transfer.to,
            value: TokenAmount::new(transfer.value),
            tx_hash: log.transaction_hash,
            observed_at,
        })
    }

    // One line summary as displayed in the transactions list
    pub fn describe(&self) -> String {
        format!(
            "[{}] Transfer: {} {} from {} to {}",
            format_local_time(self.observed_at),
            self.value,
            TOKEN_SYMBOL,
            shorten_address(&self.from),
            shorten_address(&self.to)
        )
    }
}

// Most recent transfers in arrival order, the oldest is evicted first
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<TransferEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, event: TransferEvent) {
        if self.capacity == 0 {
            return;
        }

        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransferEvent> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<TransferEvent> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub type SharedEventLog = Arc<Mutex<EventLog>>;

// Active subscription of the feed
pub struct SubscriptionHandle {
    id: String,
    provider: SharedProvider,
    abort: AbortHandle,
    cancelled: Arc<AtomicBool>,
    log: SharedEventLog,
}

impl SubscriptionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst)
    }

    // Stop the feed and unsubscribe from the provider
    // No event is appended to the log once this returns
    pub async fn cancel(self) -> Result<(), WalletError> {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.abort.abort();

        // Wait for an append in progress to finish, the next ones see the flag
        drop(self.log.lock().await);

        if log::log_enabled!(log::Level::Debug) {
            debug!("cancelling subscription {}", self.id);
        }
        match self.provider.unsubscribe(&self.id).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("subscription {} was unknown to the provider", self.id);
                Ok(())
            }
            Err(e) => {
                if log::log_enabled!(log::Level::Warn) {
                    warn!("unsubscribe of {} failed, releasing it locally: {}", self.id, e);
                }
                self.provider.forget(&self.id);
                Err(e.into())
            }
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            if log::log_enabled!(log::Level::Debug) {
                debug!("subscription {} dropped without cancel", self.id);
            }
            self.abort.abort();
            self.provider.forget(&self.id);
        }
    }
}

pub struct EventFeed;

impl EventFeed {
    // Subscribe to the transfers of the contract and fill the log in background
    pub async fn activate(contract: &ContractBinding, log: SharedEventLog) -> Result<SubscriptionHandle, WalletError> {
        trace!("activate event feed on {}", contract.address());
        let provider = contract.provider().clone();
        let filter = LogFilter::new(*contract.address(), vec![Some(Transfer::SIGNATURE_HASH)]);
        let subscription = provider.subscribe_logs(filter).await?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let (abort, registration) = AbortHandle::new_pair();
        let pump = Self::pump(subscription.receiver, Arc::clone(&log), Arc::clone(&cancelled));
        spawn_task("event-feed", Abortable::new(pump, registration));

        if log::log_enabled!(log::Level::Debug) {
            debug!("event feed active with subscription {}", subscription.id);
        }

        Ok(SubscriptionHandle {
            id: subscription.id,
            provider,
            abort,
            cancelled,
            log,
        })
    }

    async fn pump(mut receiver: UnboundedReceiver<RpcLog>, events: SharedEventLog, cancelled: Arc<AtomicBool>) {
        while let Some(entry) = receiver.next().await {
            if entry.removed {
                continue;
            }

            let event = match TransferEvent::from_log(&entry, get_current_time_in_millis()) {
                Ok(event) => event,
                Err(e) => {
                    if log::log_enabled!(log::Level::Warn) {
                        warn!("skipping malformed transfer log: {}", e);
                    }
                    continue;
                }
            };

            let mut events = events.lock().await;
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            events.push(event);
        }

        trace!("event feed stopped");
    }
}
