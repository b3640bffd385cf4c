//! Wallet session orchestration
//!
//! The [`SessionController`] owns every piece of mutable session state:
//! the connected account, its bound contract, the roles, the balances and
//! the transfer log. State changes only happen through its transitions:
//!
//! ```text
//! Disconnected --connect()--> Connecting --ok--> Connected
//!                                 |                  |
//!                                 +--error--> Disconnected <--disconnect()
//! ```
//!
//! Each transition bumps a generation counter. Asynchronous work started
//! under an older generation is discarded instead of being applied, so a
//! late response of a superseded connection never leaks into the current one.

use crate::{
    balance::{BalanceState, BalanceSync},
    config::SessionConfig,
    connection::{ChainConnection, Signer},
    contract::{ContractBinding, WriteCall},
    error::WalletError,
    event_feed::{EventFeed, EventLog, SharedEventLog, SubscriptionHandle, TransferEvent},
    pipeline::{BusyFlag, LogNotifier, Notifier, TransactionPipeline},
    roles::{Capability, RoleResolver, RoleState},
    validation::{check_burn_amount, parse_positive_amount},
};
use alloy_primitives::{Address, TxHash};
use lir_common::{
    address::shorten_address,
    amount::TokenAmount,
    rpc::TransactionReceipt,
    time::format_local_time,
    tokio::sync::{Mutex, RwLock},
};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

// A connected account with its bound contract
#[derive(Debug, Clone)]
pub struct Session {
    account: Address,
    signer: Signer,
    contract: ContractBinding,
    generation: u64,
}

impl Session {
    pub fn account(&self) -> &Address {
        &self.account
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn contract(&self) -> &ContractBinding {
        &self.contract
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Default)]
struct SessionState {
    state: ConnectionState,
    generation: u64,
    session: Option<Session>,
    roles: Option<RoleState>,
    balances: Option<BalanceState>,
    events: Option<SharedEventLog>,
    subscription: Option<SubscriptionHandle>,
}

impl SessionState {
    // Drop everything of the current session and start a new generation
    // The subscription is returned so it can be cancelled outside of the lock
    fn reset(&mut self, state: ConnectionState) -> Option<SubscriptionHandle> {
        let subscription = self.subscription.take();
        self.generation += 1;
        self.state = state;
        self.session = None;
        self.roles = None;
        self.balances = None;
        self.events = None;
        subscription
    }
}

// Transfer as displayed in the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub from: Address,
    pub to: Address,
    pub value: TokenAmount,
    pub tx_hash: Option<TxHash>,
    // HH:MM:SS local time of arrival
    pub time: String,
    pub description: String,
}

impl From<&TransferEvent> for EventView {
    fn from(event: &TransferEvent) -> Self {
        Self {
            from: event.from,
            to: event.to,
            value: event.value,
            tx_hash: event.tx_hash,
            time: format_local_time(event.observed_at),
            description: event.describe(),
        }
    }
}

// Everything the dashboard needs to render the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub account: Option<Address>,
    pub short_account: Option<String>,
    pub balances: Option<BalanceState>,
    pub roles: Option<RoleState>,
    pub capabilities: Vec<Capability>,
    pub busy: bool,
    pub events: Vec<EventView>,
}

pub struct SessionController {
    connection: ChainConnection,
    config: SessionConfig,
    state: RwLock<SessionState>,
    pipeline: TransactionPipeline,
}

impl SessionController {
    pub fn new(connection: ChainConnection, config: SessionConfig) -> Self {
        Self::with_notifier(connection, config, Arc::new(LogNotifier))
    }

    pub fn with_notifier(connection: ChainConnection, config: SessionConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            connection,
            config,
            state: RwLock::new(SessionState::default()),
            pipeline: TransactionPipeline::new(BusyFlag::new(), notifier),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn busy_flag(&self) -> &BusyFlag {
        self.pipeline.busy()
    }

    pub fn is_busy(&self) -> bool {
        self.pipeline.busy().is_busy()
    }

    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.state
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.state == ConnectionState::Connected
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub async fn account(&self) -> Option<Address> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .map(|session| session.account)
    }

    pub async fn roles(&self) -> Option<RoleState> {
        self.state.read().await.roles
    }

    pub async fn balances(&self) -> Option<BalanceState> {
        self.state.read().await.balances
    }

    // Transfers received by the current session, oldest first
    pub async fn events(&self) -> Vec<TransferEvent> {
        let events = self.state.read().await.events.clone();
        match events {
            Some(events) => events.lock().await.to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn has_subscription(&self) -> bool {
        self.state
            .read()
            .await
            .subscription
            .as_ref()
            .map_or(false, |s| s.is_active())
    }

    // Connect the wallet, bind the contract and load the session data
    // A connected session is torn down first
    pub async fn connect(&self) -> Result<Address, WalletError> {
        trace!("connect");
        let _busy = self.pipeline.busy().acquire();

        let (generation, previous) = {
            let mut state = self.state.write().await;
            let previous = state.reset(ConnectionState::Connecting);
            (state.generation, previous)
        };
        Self::cancel_subscription(previous).await;

        match self.load(generation).await {
            Ok(account) => Ok(account),
            Err(e) => {
                if log::log_enabled!(log::Level::Error) {
                    error!("Error connecting wallet: {}", e);
                }

                let mut state = self.state.write().await;
                if state.generation == generation {
                    state.state = ConnectionState::Disconnected;
                }
                Err(e)
            }
        }
    }

    async fn load(&self, generation: u64) -> Result<Address, WalletError> {
        let (account, signer) = self.connection.connect().await?;
        let contract = ContractBinding::new(
            self.config.contract_address,
            signer.clone(),
            self.config.receipt_poll_interval(),
        );

        let events: SharedEventLog = Arc::new(Mutex::new(EventLog::new(self.config.event_capacity)));
        let subscription = match EventFeed::activate(&contract, Arc::clone(&events)).await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                if log::log_enabled!(log::Level::Error) {
                    error!("Error subscribing to transfers: {}", e);
                }
                None
            }
        };

        let (roles, balances) = futures::join!(
            RoleResolver::resolve(&contract, &account),
            BalanceSync::refresh(&contract, &account)
        );

        let roles = roles.unwrap_or_else(|e| {
            if log::log_enabled!(log::Level::Error) {
                error!("Error checking roles: {}", e);
            }
            RoleState::default()
        });
        let balances = balances.unwrap_or_else(|e| {
            if log::log_enabled!(log::Level::Error) {
                error!("Error updating balances: {}", e);
            }
            BalanceState::default()
        });

        let mut state = self.state.write().await;
        if state.generation != generation {
            drop(state);
            if log::log_enabled!(log::Level::Debug) {
                debug!("discarding connection of generation {}", generation);
            }
            Self::cancel_subscription(subscription).await;
            return Err(WalletError::NotConnected);
        }

        state.state = ConnectionState::Connected;
        state.session = Some(Session {
            account,
            signer,
            contract,
            generation,
        });
        state.roles = Some(roles);
        state.balances = Some(balances);
        state.events = Some(events);
        state.subscription = subscription;

        if log::log_enabled!(log::Level::Info) {
            info!("Connected with {}", account);
        }
        Ok(account)
    }

    // Connect without any prompt if an account is already authorized
    // Returns false if nothing was authorized
    pub async fn auto_connect(&self) -> Result<bool, WalletError> {
        if !self.connection.is_available() {
            debug!("no wallet provider, skipping auto connect");
            return Ok(false);
        }

        match self.connection.check_existing().await? {
            Some(account) => {
                if log::log_enabled!(log::Level::Debug) {
                    debug!("found authorized account {}, reconnecting", account);
                }
                self.connect().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Tear down the session and cancel the transfer subscription
    pub async fn disconnect(&self) {
        trace!("disconnect");
        let subscription = {
            let mut state = self.state.write().await;
            state.reset(ConnectionState::Disconnected)
        };
        Self::cancel_subscription(subscription).await;
    }

    async fn cancel_subscription(subscription: Option<SubscriptionHandle>) {
        if let Some(subscription) = subscription {
            if let Err(e) = subscription.cancel().await {
                if log::log_enabled!(log::Level::Warn) {
                    warn!("Error while unsubscribing: {}", e);
                }
            }
        }
    }

    // Reload the roles, they are only replaced if the query succeeded
    // A result of a session replaced in the meantime is discarded
    pub async fn refresh_roles(&self) -> Result<RoleState, WalletError> {
        let session = self.session().await.ok_or(WalletError::NotConnected)?;
        let roles = match RoleResolver::resolve(session.contract(), session.account()).await {
            Ok(roles) => roles,
            Err(e) => {
                if log::log_enabled!(log::Level::Error) {
                    error!("Error checking roles: {}", e);
                }
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        if state.generation != session.generation {
            if log::log_enabled!(log::Level::Debug) {
                debug!("discarding roles of generation {}", session.generation);
            }
            return Err(WalletError::NotConnected);
        }

        state.roles = Some(roles);
        Ok(roles)
    }

    // Reload the balances, they are only replaced if the query succeeded
    // A result of a session replaced in the meantime is discarded
    pub async fn refresh_balances(&self) -> Result<BalanceState, WalletError> {
        let session = self.session().await.ok_or(WalletError::NotConnected)?;
        let balances = match BalanceSync::refresh(session.contract(), session.account()).await {
            Ok(balances) => balances,
            Err(e) => {
                if log::log_enabled!(log::Level::Error) {
                    error!("Error updating balances: {}", e);
                }
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        if state.generation != session.generation {
            if log::log_enabled!(log::Level::Debug) {
                debug!("discarding balances of generation {}", session.generation);
            }
            return Err(WalletError::NotConnected);
        }

        state.balances = Some(balances);
        Ok(balances)
    }

    // Submit a write call with its default success message
    pub async fn submit(&self, call: WriteCall) -> Result<TransactionReceipt, WalletError> {
        let message = call.default_message();
        self.submit_with_message(call, &message).await
    }

    pub async fn submit_with_message(&self, call: WriteCall, message: &str) -> Result<TransactionReceipt, WalletError> {
        let (session, balances) = {
            let state = self.state.read().await;
            (state.session.clone(), state.balances)
        };

        // Same rule as the burn form: never more than the known balance
        if let (Some(_), WriteCall::BurnTokens { amount }, Some(balances)) = (&session, &call, balances) {
            let checked = parse_positive_amount(amount)
                .and_then(|amount| check_burn_amount(amount, balances.user_balance));
            if let Err(e) = checked {
                return Err(self.pipeline.reject(&call, e));
            }
        }

        let confirmation = self
            .pipeline
            .submit(session.as_ref().map(Session::contract), &call, message)
            .await?;

        if let (Some(session), Some(balances)) = (session, confirmation.balances) {
            let mut state = self.state.write().await;
            if state.generation == session.generation {
                state.balances = Some(balances);
            }
        }

        Ok(confirmation.receipt)
    }

    pub async fn set_manager(&self, manager: &str, status: bool) -> Result<TransactionReceipt, WalletError> {
        self.submit(WriteCall::SetManager {
            manager: manager.to_owned(),
            status,
        })
        .await
    }

    pub async fn distribute_to_manager(&self, manager: &str, amount: &str) -> Result<TransactionReceipt, WalletError> {
        self.submit(WriteCall::DistributeToManager {
            manager: manager.to_owned(),
            amount: amount.to_owned(),
        })
        .await
    }

    pub async fn reward_student(&self, student: &str, amount: &str) -> Result<TransactionReceipt, WalletError> {
        self.submit(WriteCall::RewardStudent {
            student: student.to_owned(),
            amount: amount.to_owned(),
        })
        .await
    }

    pub async fn burn_tokens(&self, amount: &str) -> Result<TransactionReceipt, WalletError> {
        self.submit(WriteCall::BurnTokens {
            amount: amount.to_owned(),
        })
        .await
    }

    // Build the dashboard view of the session
    pub async fn snapshot(&self) -> SessionSnapshot {
        let (state, account, roles, balances, events) = {
            let state = self.state.read().await;
            (
                state.state,
                state.session.as_ref().map(|s| s.account),
                state.roles,
                state.balances,
                state.events.clone(),
            )
        };

        let events = match events {
            Some(events) => events.lock().await.iter().map(EventView::from).collect(),
            None => Vec::new(),
        };

        SessionSnapshot {
            state,
            account,
            short_account: account.as_ref().map(shorten_address),
            balances,
            roles,
            capabilities: roles.map(|r| r.capabilities()).unwrap_or_default(),
            busy: self.is_busy(),
            events,
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Unmount: the handle stops the feed and releases the subscription when dropped
        if let Some(subscription) = self.state.get_mut().subscription.take() {
            if log::log_enabled!(log::Level::Debug) {
                debug!("dropping session with subscription {}", subscription.id());
            }
        }
    }
}
