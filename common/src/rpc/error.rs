use crate::token::decode_revert_reason;
use alloy_primitives::hex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Error codes defined by EIP-1193 and the Ethereum JSON-RPC specification
pub const USER_REJECTED_REQUEST: i64 = 4001;
pub const UNAUTHORIZED: i64 = 4100;
pub const UNSUPPORTED_METHOD: i64 = 4200;
pub const DISCONNECTED: i64 = 4900;
pub const CHAIN_DISCONNECTED: i64 = 4901;
pub const EXECUTION_REVERTED: i64 = 3;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const SERVER_ERROR: i64 = -32000;

// Prefix used by nodes when a call or an estimation reverted
const REVERTED_MESSAGE_PREFIX: &str = "execution reverted";

// Error object of a JSON-RPC response, also thrown by injected providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{} (code {})", .0.message, .0.code)]
    Rpc(RpcErrorObject),
    #[error("Transport error: {}", _0)]
    Transport(String),
    #[error("Invalid response: {}", _0)]
    InvalidResponse(String),
    #[error("Subscription was closed")]
    SubscriptionClosed,
}

impl ProviderError {
    pub fn rpc<S: Into<String>>(code: i64, message: S) -> Self {
        Self::Rpc(RpcErrorObject {
            code,
            message: message.into(),
            data: None,
        })
    }

    pub fn rpc_with_data<S: Into<String>>(code: i64, message: S, data: Value) -> Self {
        Self::Rpc(RpcErrorObject {
            code,
            message: message.into(),
            data: Some(data),
        })
    }

    pub fn get_code(&self) -> Option<i64> {
        match self {
            Self::Rpc(error) => Some(error.code),
            _ => None,
        }
    }

    pub fn is_user_rejected(&self) -> bool {
        self.get_code() == Some(USER_REJECTED_REQUEST)
    }

    // Raw revert payload carried in the error data
    // Some nodes put the hex string directly in `data`, others nest it in `data.data`
    pub fn revert_data(&self) -> Option<Vec<u8>> {
        let Self::Rpc(error) = self else {
            return None;
        };

        let data = error.data.as_ref()?;
        let payload = match data {
            Value::String(payload) => payload.as_str(),
            Value::Object(map) => map.get("data")?.as_str()?,
            _ => return None,
        };

        hex::decode(payload).ok()
    }

    // Is this error a contract execution failure
    pub fn is_reverted(&self) -> bool {
        match self {
            Self::Rpc(error) => {
                error.code == EXECUTION_REVERTED
                    || error.message.starts_with(REVERTED_MESSAGE_PREFIX)
                    || self
                        .revert_data()
                        .is_some_and(|data| decode_revert_reason(&data).is_some())
            }
            _ => false,
        }
    }

    // Best human readable reason of a revert
    // The structured payload wins over the text of the message
    pub fn revert_reason(&self) -> Option<String> {
        if let Some(reason) = self
            .revert_data()
            .and_then(|data| decode_revert_reason(&data))
        {
            return Some(reason);
        }

        let Self::Rpc(error) = self else {
            return None;
        };

        // "execution reverted: reason"
        error
            .message
            .strip_prefix(REVERTED_MESSAGE_PREFIX)
            .map(|rest| rest.trim_start_matches(':').trim())
            .filter(|rest| !rest.is_empty())
            .map(str::to_owned)
    }
}

impl From<RpcErrorObject> for ProviderError {
    fn from(error: RpcErrorObject) -> Self {
        Self::Rpc(error)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}
