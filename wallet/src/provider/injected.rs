use async_trait::async_trait;
use futures::channel::mpsc::unbounded;
use js_sys::{Function, Object, Promise, Reflect, JSON};
use lir_common::{
    provider::{Eip1193Provider, LogSubscription},
    rpc::{LogFilter, ProviderError, RpcErrorObject, RpcLog, SubscriptionNotification, INTERNAL_ERROR},
};
use log::{debug, trace, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{cell::RefCell, collections::HashMap};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};

// Payload of the `message` event of an EIP-1193 provider
#[derive(Deserialize)]
struct ProviderMessage {
    #[serde(rename = "type")]
    kind: String,
    data: Value,
}

type MessageListener = Closure<dyn FnMut(JsValue)>;

// Wallet extension injected by the browser as `window.ethereum`
pub struct InjectedProvider {
    ethereum: Object,
    listeners: RefCell<HashMap<String, MessageListener>>,
}

fn to_js(value: &Value) -> Result<JsValue, ProviderError> {
    JSON::parse(&value.to_string())
        .map_err(|e| ProviderError::InvalidResponse(format!("{:?}", e)))
}

fn from_js(value: &JsValue) -> Result<Value, ProviderError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }

    let text = JSON::stringify(value)
        .map_err(|e| ProviderError::InvalidResponse(format!("{:?}", e)))?
        .as_string()
        .unwrap_or_default();
    Ok(serde_json::from_str(&text)?)
}

// Rejections of the wallet carry an `{ code, message, data }` object
fn rejection_to_error(error: &JsValue) -> ProviderError {
    match from_js(error).ok().and_then(|v| serde_json::from_value::<RpcErrorObject>(v).ok()) {
        Some(error) => ProviderError::Rpc(error),
        None => {
            let message = Reflect::get(error, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
                .unwrap_or_else(|| format!("{:?}", error));
            ProviderError::rpc(INTERNAL_ERROR, message)
        }
    }
}

fn provider_function(ethereum: &Object, name: &str) -> Result<Function, ProviderError> {
    Reflect::get(ethereum, &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .ok_or_else(|| ProviderError::Transport(format!("provider has no {} function", name)))
}

// Call `ethereum.request({ method, params })` and wait for the promise
async fn send_request(ethereum: &Object, method: &str, params: Value) -> Result<Value, ProviderError> {
    let args = to_js(&json!({ "method": method, "params": params }))?;
    let promise = provider_function(ethereum, "request")?
        .call1(ethereum, &args)
        .map_err(|e| rejection_to_error(&e))?
        .dyn_into::<Promise>()
        .map_err(|_| ProviderError::InvalidResponse("request did not return a promise".into()))?;

    let result = JsFuture::from(promise)
        .await
        .map_err(|e| rejection_to_error(&e))?;
    from_js(&result)
}

impl InjectedProvider {
    // Look for the injected provider, None if no wallet extension is installed
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            debug!("no injected provider found");
            return None;
        }

        Some(Self {
            ethereum: ethereum.dyn_into::<Object>().ok()?,
            listeners: RefCell::new(HashMap::new()),
        })
    }

    fn function(&self, name: &str) -> Result<Function, ProviderError> {
        provider_function(&self.ethereum, name)
    }

    fn remove_listener(&self, listener: &MessageListener) {
        match self.function("removeListener") {
            Ok(remove) => {
                if let Err(e) = remove.call2(&self.ethereum, &JsValue::from_str("message"), listener.as_ref()) {
                    warn!("Error while removing message listener: {:?}", e);
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for InjectedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        trace!("injected request: {}", method);
        send_request(&self.ethereum, method, params).await
    }

    async fn subscribe_logs(&self, filter: LogFilter) -> Result<LogSubscription, ProviderError> {
        let id: String = serde_json::from_value(
            self.request("eth_subscribe", json!(["logs", filter])).await?,
        )?;

        let (sender, receiver) = unbounded::<RpcLog>();
        let subscription = id.clone();
        let listener: MessageListener = Closure::wrap(Box::new(move |message: JsValue| {
            let message = match from_js(&message).and_then(|v| Ok(serde_json::from_value::<ProviderMessage>(v)?)) {
                Ok(message) => message,
                Err(_) => return,
            };
            if message.kind != "eth_subscription" {
                return;
            }

            match serde_json::from_value::<SubscriptionNotification>(message.data) {
                Ok(notification) if notification.subscription == subscription => {
                    match serde_json::from_value::<RpcLog>(notification.result) {
                        Ok(log) => {
                            // Receiver gone, the listener is removed on unsubscribe
                            let _ = sender.unbounded_send(log);
                        }
                        Err(e) => warn!("invalid log notification: {}", e),
                    }
                }
                _ => {}
            }
        }) as Box<dyn FnMut(JsValue)>);

        self.function("on")?
            .call2(&self.ethereum, &JsValue::from_str("message"), listener.as_ref())
            .map_err(|e| rejection_to_error(&e))?;
        self.listeners.borrow_mut().insert(id.clone(), listener);

        Ok(LogSubscription { id, receiver })
    }

    async fn unsubscribe(&self, id: &str) -> Result<bool, ProviderError> {
        let listener = self.listeners.borrow_mut().remove(id);
        if let Some(listener) = listener.as_ref() {
            self.remove_listener(listener);
        }

        let removed: bool = serde_json::from_value(
            self.request("eth_unsubscribe", json!([id])).await?,
        )?;
        Ok(removed || listener.is_some())
    }

    // The listener goes away now, the wallet is told in background
    fn forget(&self, id: &str) {
        let listener = self.listeners.borrow_mut().remove(id);
        if let Some(listener) = listener.as_ref() {
            self.remove_listener(listener);
        }

        let ethereum = self.ethereum.clone();
        let id = id.to_owned();
        spawn_local(async move {
            if let Err(e) = send_request(&ethereum, "eth_unsubscribe", json!([id])).await {
                warn!("Error while releasing subscription {}: {}", id, e);
            }
        });
    }
}

impl Drop for InjectedProvider {
    fn drop(&mut self) {
        let listeners: Vec<_> = self.listeners.borrow_mut().drain().map(|(_, l)| l).collect();
        for listener in listeners.iter() {
            self.remove_listener(listener);
        }
    }
}
