use alloy_primitives::U64;
use anyhow::Context;
use async_trait::async_trait;
use futures::{
    channel::mpsc::{unbounded, UnboundedSender},
    future::{AbortHandle, Abortable},
};
use lir_common::{
    provider::{Eip1193Provider, LogSubscription},
    rpc::{BlockTag, LogFilter, ProviderError, RpcLog, RpcRequest, RpcResponse},
    tokio::{sleep, spawn_task},
};
use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

struct Client {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl Client {
    async fn send(&self, method: &str, params: &Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if log::log_enabled!(log::Level::Trace) {
            trace!("rpc request #{} {}", id, method);
        }

        let request = RpcRequest::new(id, method, params);
        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let response: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(error.into());
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, ProviderError> {
        let value = self.send(method, &params).await?;
        serde_json::from_value(value).map_err(ProviderError::from)
    }
}

// JSON-RPC node reached over HTTP
// A node has no permission prompt and no push notifications:
// account requests are plain `eth_accounts` and log subscriptions are
// emulated by polling `eth_getLogs`
pub struct HttpProvider {
    client: Arc<Client>,
    log_poll_interval: Duration,
    next_subscription: AtomicU64,
    subscriptions: Mutex<HashMap<String, AbortHandle>>,
}

impl HttpProvider {
    pub fn new<S: ToString>(url: S, log_poll_interval: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Error while building the HTTP client")?;

        Ok(Self {
            client: Arc::new(Client {
                http,
                url: url.to_string(),
                next_id: AtomicU64::new(1),
            }),
            log_poll_interval,
            next_subscription: AtomicU64::new(1),
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    pub fn url(&self) -> &str {
        &self.client.url
    }

    // A panic while holding the lock leaves the map usable
    fn subscriptions(&self) -> MutexGuard<'_, HashMap<String, AbortHandle>> {
        self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Check that the node answers and return its chain id
    pub async fn chain_id(&self) -> Result<U64, ProviderError> {
        self.client.call("eth_chainId", json!([])).await
    }

    async fn poll_logs(client: Arc<Client>, filter: LogFilter, mut from_block: U64, interval: Duration, sender: UnboundedSender<RpcLog>) {
        loop {
            sleep(interval).await;
            if sender.is_closed() {
                break;
            }

            let latest: U64 = match client.call("eth_blockNumber", json!([])).await {
                Ok(latest) => latest,
                Err(e) => {
                    if log::log_enabled!(log::Level::Warn) {
                        warn!("Error while fetching the block number: {}", e);
                    }
                    continue;
                }
            };

            if latest < from_block {
                continue;
            }

            let range = filter.with_range(BlockTag::Number(from_block), BlockTag::Number(latest));
            let logs: Vec<RpcLog> = match client.call("eth_getLogs", json!([range])).await {
                Ok(logs) => logs,
                Err(e) => {
                    if log::log_enabled!(log::Level::Warn) {
                        warn!("Error while fetching logs: {}", e);
                    }
                    continue;
                }
            };

            for log in logs {
                if sender.unbounded_send(log).is_err() {
                    debug!("log receiver closed, stopping polling");
                    return;
                }
            }
            from_block = latest.saturating_add(U64::from(1u64));
        }
    }
}

#[async_trait]
impl Eip1193Provider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let method = match method {
            "eth_requestAccounts" => "eth_accounts",
            method => method,
        };
        self.client.send(method, &params).await
    }

    async fn subscribe_logs(&self, filter: LogFilter) -> Result<LogSubscription, ProviderError> {
        // Only the logs of the blocks after the subscription are delivered
        let latest: U64 = self.client.call("eth_blockNumber", json!([])).await?;
        let id = format!("0x{:x}", self.next_subscription.fetch_add(1, Ordering::SeqCst));

        let (sender, receiver) = unbounded();
        let (abort, registration) = AbortHandle::new_pair();
        let task = Self::poll_logs(
            Arc::clone(&self.client),
            filter,
            latest.saturating_add(U64::from(1u64)),
            self.log_poll_interval,
            sender,
        );
        spawn_task("http-log-polling", Abortable::new(task, registration));

        self.subscriptions().insert(id.clone(), abort);
        if log::log_enabled!(log::Level::Debug) {
            debug!("polling logs from block {} for subscription {}", latest, id);
        }

        Ok(LogSubscription { id, receiver })
    }

    async fn unsubscribe(&self, id: &str) -> Result<bool, ProviderError> {
        match self.subscriptions().remove(id) {
            Some(abort) => {
                abort.abort();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Polling is local, nothing to tell the node
    fn forget(&self, id: &str) {
        if let Some(abort) = self.subscriptions().remove(id) {
            abort.abort();
        }
    }
}

impl Drop for HttpProvider {
    fn drop(&mut self) {
        let subscriptions = self.subscriptions.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, abort) in subscriptions.drain() {
            abort.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_subscription() {
        let provider = HttpProvider::new("http://127.0.0.1:1", Duration::from_millis(10)).unwrap();
        assert_eq!(provider.url(), "http://127.0.0.1:1");
        assert!(!provider.unsubscribe("0x1").await.unwrap());
        provider.forget("0x1");
    }

    #[tokio::test]
    async fn test_forget_aborts_polling() {
        let provider = HttpProvider::new("http://127.0.0.1:1", Duration::from_millis(10)).unwrap();
        let (abort, registration) = AbortHandle::new_pair();
        let task = Abortable::new(futures::future::pending::<()>(), registration);
        provider.subscriptions().insert("0x7".to_owned(), abort);

        provider.forget("0x7");
        assert!(provider.subscriptions().is_empty());
        assert!(task.is_aborted());
        assert!(!provider.unsubscribe("0x7").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_transport_error() {
        let provider = HttpProvider::new("http://127.0.0.1:1", Duration::from_millis(10)).unwrap();
        let error = provider.request("eth_accounts", json!([])).await.unwrap_err();
        assert!(matches!(error, ProviderError::Transport(_)));
    }
}
