//! Async runtime shims shared by native and browser builds

pub mod sync;

use log::trace;
use std::{future::Future, time::Duration};

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::task::JoinHandle;

#[cfg(target_arch = "wasm32")]
pub use tokio_with_wasm::task::JoinHandle;

// Spawn a named background task
// The name is only used for tracing
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_task<F>(name: &str, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    if log::log_enabled!(log::Level::Trace) {
        trace!("spawning task: {}", name);
    }
    tokio::spawn(future)
}

#[cfg(target_arch = "wasm32")]
pub fn spawn_task<F>(name: &str, future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    if log::log_enabled!(log::Level::Trace) {
        trace!("spawning task: {}", name);
    }
    tokio_with_wasm::task::spawn(future)
}

// Suspend the current task for the given duration
pub async fn sleep(duration: Duration) {
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;

    #[cfg(target_arch = "wasm32")]
    tokio_with_wasm::time::sleep(duration).await;
}
