use super::{RpcErrorObject, JSON_RPC_VERSION};
use alloy_primitives::{Address, Bytes, TxHash, B256, U256, U64};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

// JSON-RPC request sent over HTTP
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: Cow<'a, str>,
    pub params: Cow<'a, Value>,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION,
            id,
            method: Cow::Borrowed(method),
            params: Cow::Borrowed(params),
        }
    }
}

// JSON-RPC response, exactly one of result or error is set
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

// Block selector used by eth_call and log filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(U64),
}

impl Serialize for BlockTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Latest => serializer.serialize_str("latest"),
            Self::Number(number) => number.serialize(serializer),
        }
    }
}

// Call or transaction sent to the contract
// `from` is mandatory for eth_sendTransaction, optional for eth_call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

// Filter of eth_getLogs / eth_subscribe("logs")
// A None topic is a wildcard at that position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub address: Address,
    pub topics: Vec<Option<B256>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockTag>,
}

impl LogFilter {
    pub fn new(address: Address, topics: Vec<Option<B256>>) -> Self {
        Self {
            address,
            topics,
            from_block: None,
            to_block: None,
        }
    }

    pub fn with_range(&self, from_block: BlockTag, to_block: BlockTag) -> Self {
        Self {
            from_block: Some(from_block),
            to_block: Some(to_block),
            ..self.clone()
        }
    }

    // Check if a log is selected by this filter
    pub fn matches(&self, log: &RpcLog) -> bool {
        if log.address != self.address {
            return false;
        }

        self.topics.iter().enumerate().all(|(i, topic)| match topic {
            Some(expected) => log.topics.get(i) == Some(expected),
            None => true,
        })
    }
}

// A log emitted by a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub transaction_hash: Option<TxHash>,
    #[serde(default)]
    pub log_index: Option<U64>,
    // Set when the log was dropped by a chain reorganization
    #[serde(default)]
    pub removed: bool,
}

// Receipt returned by eth_getTransactionReceipt once the transaction is included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub block_number: Option<U64>,
    // 1 for success, 0 for failure
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub gas_used: Option<U256>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

impl TransactionReceipt {
    // Pre-byzantium receipts have no status, they are considered successful
    pub fn is_success(&self) -> bool {
        self.status.map_or(true, |status| !status.is_zero())
    }
}

// Payload of an eth_subscription notification
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionNotification {
    pub subscription: String,
    pub result: Value,
}
