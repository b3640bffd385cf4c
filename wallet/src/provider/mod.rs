//! Implementations of the wallet provider boundary

#[cfg(all(feature = "http", not(target_arch = "wasm32")))]
mod http;

#[cfg(target_arch = "wasm32")]
mod injected;

#[cfg(all(feature = "http", not(target_arch = "wasm32")))]
pub use http::HttpProvider;

#[cfg(target_arch = "wasm32")]
pub use injected::InjectedProvider;

pub use lir_common::provider::{Eip1193Provider, LogSubscription, SharedProvider};
