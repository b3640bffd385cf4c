//! Tokio synchronization primitives
//!
//! Native builds re-export `tokio::sync` directly, browser builds use the
//! `tokio_with_wasm` port which keeps the same API on top of the JS event loop.

#[cfg(target_arch = "wasm32")]
pub use tokio_with_wasm::sync::*;

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::sync::*;
