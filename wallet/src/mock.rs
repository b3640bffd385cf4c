//! In-memory wallet provider running a simulated LIR token contract
//!
//! The contract rules are enforced the way the deployed contract does:
//! only the admin manages managers and distributes, only managers reward,
//! anyone burns their own tokens. Violations revert with an `Error(string)`
//! payload. Every request is recorded and any method can be made to fail.

use crate::{config::SessionConfig, pipeline::Notifier};
use alloy_primitives::{hex, keccak256, Address, Bytes, TxHash, U256, U64};
use alloy_sol_types::{SolEvent, SolInterface, SolValue};
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use lir_common::{
    amount::TokenAmount,
    provider::{Eip1193Provider, LogSubscription},
    rpc::{
        LogFilter, ProviderError, RpcLog, TransactionReceipt, TransactionRequest, EXECUTION_REVERTED,
        INTERNAL_ERROR, INVALID_PARAMS, UNSUPPORTED_METHOD, USER_REJECTED_REQUEST,
    },
    token::{encode_revert_reason, ILirToken::ILirTokenCalls, Transfer},
    tokio::sleep,
};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

pub const ONLY_ADMIN: &str = "Only admin can call this";
pub const ONLY_MANAGER: &str = "Only manager can call this";
pub const NOT_A_MANAGER: &str = "Address is not a manager";
pub const NOT_ENOUGH_TOKENS: &str = "Not enough tokens";

struct MockState {
    accounts: Vec<Address>,
    authorized: bool,
    reject_connection: bool,
    admin: Address,
    contract: Address,
    managers: HashSet<Address>,
    balances: HashMap<Address, U256>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    receipt_delay: usize,
    pending_polls: HashMap<TxHash, usize>,
    fail_receipts: bool,
    failing: HashSet<String>,
    latency: HashMap<String, Duration>,
    requests: Vec<String>,
    subscriptions: HashMap<String, (LogFilter, UnboundedSender<RpcLog>)>,
    next_subscription: u64,
    nonce: u64,
    block: u64,
}

impl MockState {
    fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<RpcLog, ProviderError> {
        let balance = self.balance(&from);
        if balance < value {
            return Err(revert(NOT_ENOUGH_TOKENS));
        }

        self.balances.insert(from, balance - value);
        if !to.is_zero() {
            let balance = self.balance(&to);
            self.balances.insert(to, balance.saturating_add(value));
        }

        Ok(self.transfer_log(from, to, value, None))
    }

    fn transfer_log(&self, from: Address, to: Address, value: U256, tx: Option<TxHash>) -> RpcLog {
        RpcLog {
            address: self.contract,
            topics: vec![Transfer::SIGNATURE_HASH, from.into_word(), to.into_word()],
            data: value.abi_encode().into(),
            block_number: Some(U64::from(self.block)),
            transaction_hash: tx,
            log_index: Some(U64::ZERO),
            removed: false,
        }
    }

    // Deliver a log to the matching subscriptions, closed ones are pruned
    fn emit(&mut self, log: RpcLog) {
        self.subscriptions.retain(|_, (filter, sender)| {
            if !filter.matches(&log) {
                return !sender.is_closed();
            }
            sender.unbounded_send(log.clone()).is_ok()
        });
    }

    fn read(&self, data: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let output = match decode_call(data)? {
            ILirTokenCalls::admin(_) => self.admin.abi_encode(),
            ILirTokenCalls::managers(call) => self.managers.contains(&call.account).abi_encode(),
            ILirTokenCalls::balanceOf(call) => self.balance(&call.account).abi_encode(),
            _ => return Err(ProviderError::rpc(EXECUTION_REVERTED, "execution reverted")),
        };

        Ok(output)
    }

    // Apply a state changing call, returns the emitted logs
    fn write(&mut self, sender: Address, data: &[u8]) -> Result<Vec<RpcLog>, ProviderError> {
        let contract = self.contract;

        match decode_call(data)? {
            ILirTokenCalls::setManager(call) => {
                if sender != self.admin {
                    return Err(revert(ONLY_ADMIN));
                }
                if call.status {
                    self.managers.insert(call.manager);
                } else {
                    self.managers.remove(&call.manager);
                }
                Ok(Vec::new())
            }
            ILirTokenCalls::distributeToManager(call) => {
                if sender != self.admin {
                    return Err(revert(ONLY_ADMIN));
                }
                if !self.managers.contains(&call.manager) {
                    return Err(revert(NOT_A_MANAGER));
                }
                Ok(vec![self.transfer(contract, call.manager, call.amount)?])
            }
            ILirTokenCalls::rewardStudent(call) => {
                if !self.managers.contains(&sender) {
                    return Err(revert(ONLY_MANAGER));
                }
                Ok(vec![self.transfer(sender, call.student, call.amount)?])
            }
            ILirTokenCalls::burnTokens(call) => Ok(vec![self.transfer(sender, Address::ZERO, call.amount)?]),
            _ => Err(ProviderError::rpc(EXECUTION_REVERTED, "execution reverted")),
        }
    }
}

fn revert(reason: &str) -> ProviderError {
    ProviderError::rpc_with_data(
        EXECUTION_REVERTED,
        format!("execution reverted: {}", reason),
        Value::String(hex::encode_prefixed(encode_revert_reason(reason))),
    )
}

fn invalid_params<E: ToString>(error: E) -> ProviderError {
    ProviderError::rpc(INVALID_PARAMS, error.to_string())
}

// Unknown selectors revert like a contract without fallback
fn decode_call(data: &[u8]) -> Result<ILirTokenCalls, ProviderError> {
    ILirTokenCalls::abi_decode(data, true).map_err(|e| match e {
        alloy_sol_types::Error::UnknownSelector { .. } => {
            ProviderError::rpc(EXECUTION_REVERTED, "execution reverted")
        }
        e => invalid_params(e),
    })
}

fn param<T: serde::de::DeserializeOwned>(params: &Value, index: usize) -> Result<T, ProviderError> {
    let value = params.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(invalid_params)
}

// Keeps every reported outcome, true for a success
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(bool, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(bool, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.messages.lock().unwrap().push((true, message.to_owned()));
    }

    fn failure(&self, message: &str) {
        self.messages.lock().unwrap().push((false, message.to_owned()));
    }
}

pub struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    // One account, the admin, holding 100 LIR; the contract holds 1,000,000 LIR
    pub fn new() -> Arc<Self> {
        let admin = Self::account(1);
        let chain = Self::with_accounts(vec![admin]);
        chain.set_balance(&admin, TokenAmount::from_coins(100));
        chain
    }

    pub fn with_accounts(accounts: Vec<Address>) -> Arc<Self> {
        let admin = Self::account(1);
        let contract = SessionConfig::default().contract_address;
        let mut balances = HashMap::new();
        balances.insert(contract, TokenAmount::from_coins(1_000_000).raw());

        Arc::new(Self {
            state: Mutex::new(MockState {
                accounts,
                authorized: false,
                reject_connection: false,
                admin,
                contract,
                managers: HashSet::new(),
                balances,
                receipts: HashMap::new(),
                receipt_delay: 0,
                pending_polls: HashMap::new(),
                fail_receipts: false,
                failing: HashSet::new(),
                latency: HashMap::new(),
                requests: Vec::new(),
                subscriptions: HashMap::new(),
                next_subscription: 1,
                nonce: 0,
                block: 1,
            }),
        })
    }

    // Deterministic test account
    pub fn account(id: u8) -> Address {
        Address::repeat_byte(id)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn admin(&self) -> Address {
        self.lock().admin
    }

    pub fn contract(&self) -> Address {
        self.lock().contract
    }

    pub fn balance(&self, account: &Address) -> TokenAmount {
        TokenAmount::new(self.lock().balance(account))
    }

    pub fn set_balance(&self, account: &Address, amount: TokenAmount) {
        self.lock().balances.insert(*account, amount.raw());
    }

    pub fn is_manager(&self, account: &Address) -> bool {
        self.lock().managers.contains(account)
    }

    pub fn add_manager(&self, account: &Address) {
        self.lock().managers.insert(*account);
    }

    // Switch the accounts exposed by the wallet
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.lock().accounts = accounts;
    }

    // Mark the accounts as already authorized, like a previous visit would
    pub fn authorize(&self) {
        self.lock().authorized = true;
    }

    pub fn reject_connection(&self, reject: bool) {
        self.lock().reject_connection = reject;
    }

    pub fn fail_method(&self, method: &str) {
        self.lock().failing.insert(method.to_owned());
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    // Mine every following transaction with a failed status
    pub fn fail_receipts(&self, fail: bool) {
        self.lock().fail_receipts = fail;
    }

    // Number of empty answers before a receipt is available
    pub fn set_receipt_delay(&self, polls: usize) {
        self.lock().receipt_delay = polls;
    }

    pub fn set_latency(&self, method: &str, latency: Duration) {
        self.lock().latency.insert(method.to_owned(), latency);
    }

    pub fn count_requests(&self, method: &str) -> usize {
        self.lock().requests.iter().filter(|m| *m == method).count()
    }

    pub fn total_requests(&self) -> usize {
        self.lock().requests.len()
    }

    // Subscriptions still registered, whether or not their receiver is alive
    pub fn active_subscriptions(&self) -> usize {
        self.lock().subscriptions.len()
    }

    // Transfer made by someone else on the chain
    pub fn emit_transfer(&self, from: Address, to: Address, value: TokenAmount) {
        let mut state = self.lock();
        state.block += 1;
        let tx = keccak256(state.block.to_be_bytes());
        let log = state.transfer_log(from, to, value.raw(), Some(tx));
        state.emit(log);
    }

    pub fn emit_log(&self, log: RpcLog) {
        self.lock().emit(log);
    }

    // Record the request and apply the injected failures and latency
    async fn enter(&self, method: &str) -> Result<(), ProviderError> {
        let latency = {
            let mut state = self.lock();
            state.requests.push(method.to_owned());
            if state.failing.contains(method) {
                return Err(ProviderError::rpc(INTERNAL_ERROR, "Internal JSON-RPC error"));
            }
            state.latency.get(method).copied()
        };

        if let Some(latency) = latency {
            sleep(latency).await;
        }
        Ok(())
    }

    fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash, ProviderError> {
        let mut state = self.lock();
        let sender = request.from.ok_or_else(|| invalid_params("missing from"))?;
        if request.to != state.contract {
            return Err(invalid_params("unknown contract"));
        }

        // Reverts are caught while estimating the gas, nothing is mined
        let logs = state.write(sender, &request.data)?;

        state.nonce += 1;
        state.block += 1;
        let mut preimage = sender.to_vec();
        preimage.extend_from_slice(&state.nonce.to_be_bytes());
        let hash = keccak256(&preimage);
        let logs: Vec<RpcLog> = logs
            .into_iter()
            .map(|log| RpcLog {
                transaction_hash: Some(hash),
                ..log
            })
            .collect();

        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(U64::from(state.block)),
            status: Some(U64::from(!state.fail_receipts as u64)),
            gas_used: Some(U256::from(21_000u64)),
            logs: logs.clone(),
        };
        state.receipts.insert(hash, receipt);
        let delay = state.receipt_delay;
        state.pending_polls.insert(hash, delay);

        for log in logs {
            state.emit(log);
        }

        Ok(hash)
    }

    fn receipt(&self, hash: &TxHash) -> Option<TransactionReceipt> {
        let mut state = self.lock();
        if let Some(remaining) = state.pending_polls.get_mut(hash) {
            if *remaining > 0 {
                *remaining -= 1;
                return None;
            }
        }
        state.receipts.get(hash).cloned()
    }
}

#[async_trait]
impl Eip1193Provider for MockChain {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.enter(method).await?;

        match method {
            "eth_requestAccounts" => {
                let mut state = self.lock();
                if state.reject_connection {
                    return Err(ProviderError::rpc(USER_REJECTED_REQUEST, "User rejected the request."));
                }
                state.authorized = true;
                Ok(json!(state.accounts))
            }
            "eth_accounts" => {
                let state = self.lock();
                if state.authorized {
                    Ok(json!(state.accounts))
                } else {
                    Ok(json!([]))
                }
            }
            "eth_chainId" => Ok(json!("0x539")),
            "eth_blockNumber" => Ok(json!(U64::from(self.lock().block))),
            "eth_call" => {
                let request: TransactionRequest = param(&params, 0)?;
                let output = self.lock().read(&request.data)?;
                Ok(json!(Bytes::from(output)))
            }
            "eth_sendTransaction" => {
                let request: TransactionRequest = param(&params, 0)?;
                let hash = self.send_transaction(request)?;
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => {
                let hash: TxHash = param(&params, 0)?;
                Ok(json!(self.receipt(&hash)))
            }
            method => Err(ProviderError::rpc(
                UNSUPPORTED_METHOD,
                format!("The method {} is not supported", method),
            )),
        }
    }

    async fn subscribe_logs(&self, filter: LogFilter) -> Result<LogSubscription, ProviderError> {
        self.enter("eth_subscribe").await?;

        let (sender, receiver) = unbounded();
        let mut state = self.lock();
        let id = format!("0x{:x}", state.next_subscription);
        state.next_subscription += 1;
        state.subscriptions.insert(id.clone(), (filter, sender));

        Ok(LogSubscription { id, receiver })
    }

    async fn unsubscribe(&self, id: &str) -> Result<bool, ProviderError> {
        self.enter("eth_unsubscribe").await?;
        Ok(self.lock().subscriptions.remove(id).is_some())
    }

    fn forget(&self, id: &str) {
        let mut state = self.lock();
        state.requests.push("eth_unsubscribe".to_owned());
        state.subscriptions.remove(id);
    }
}
