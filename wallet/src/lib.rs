pub mod balance;
pub mod config;
pub mod connection;
pub mod contract;
pub mod error;
pub mod event_feed;
pub mod pipeline;
pub mod provider;
pub mod roles;
pub mod session;
pub mod validation;

#[cfg(test)]
mod mock;
