//! Wallet provider boundary
//!
//! Everything the client needs from a wallet goes through the
//! [`Eip1193Provider`] trait: a single `request` entry point as defined by
//! EIP-1193, plus log subscriptions delivered over a channel so the caller
//! owns the subscription lifetime.
//!
//! In a browser the provider is the injected `window.ethereum` object, on
//! native targets it is a JSON-RPC node.

use crate::rpc::{LogFilter, ProviderError, RpcLog};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use log::trace;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

// Providers must be shareable between tasks on native targets
// In the browser everything runs on the same thread and JS values are not Send
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

pub type SharedProvider = Arc<dyn Eip1193Provider>;

// An active log subscription
// Logs are pushed on the receiver until `unsubscribe` or `forget`
// is called with the id
pub struct LogSubscription {
    pub id: String,
    pub receiver: UnboundedReceiver<RpcLog>,
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Eip1193Provider: MaybeSendSync {
    // Send a JSON-RPC request through the provider
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    // Subscribe to the logs selected by the filter
    async fn subscribe_logs(&self, filter: LogFilter) -> Result<LogSubscription, ProviderError>;

    // Cancel a subscription, returns false if it was unknown
    async fn unsubscribe(&self, id: &str) -> Result<bool, ProviderError>;

    // Release a subscription without waiting for the provider answer
    // Usable from a synchronous context such as `Drop`
    fn forget(&self, id: &str);
}

// Send a request and deserialize its result
pub async fn request_typed<P, R>(provider: &P, method: &str, params: Value) -> Result<R, ProviderError>
where
    P: Eip1193Provider + ?Sized,
    R: DeserializeOwned,
{
    if log::log_enabled!(log::Level::Trace) {
        trace!("request: {}", method);
    }

    let value = provider.request(method, params).await?;
    serde_json::from_value(value).map_err(ProviderError::from)
}
