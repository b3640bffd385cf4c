#[cfg(feature = "cli")]
use clap::Parser;
use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "cli")]
use lir_common::{
    config::VERSION,
    prompt::{default_logs_datetime_format, LogLevel},
};

pub use lir_common::config::TOKEN_SYMBOL;

// Address of the deployed LIR token contract
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xA91461c7C857266565e35A026aeb0b5c4Ec94C16";
// Number of transfer events kept in the rolling log
pub const EVENT_LOG_CAPACITY: usize = 10;
// Interval between two eth_getTransactionReceipt requests
pub const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 1000;
// Interval between two eth_getLogs requests when subscriptions are emulated
pub const DEFAULT_LOG_POLL_INTERVAL_MS: u64 = 2000;
// JSON-RPC node used by the command line client when no address is specified
pub const DEFAULT_RPC_ADDRESS: &str = "http://127.0.0.1:8545";

// Functions Helpers
fn default_contract_address() -> Address {
    address!("A91461c7C857266565e35A026aeb0b5c4Ec94C16")
}

fn default_event_capacity() -> usize {
    EVENT_LOG_CAPACITY
}

fn default_receipt_poll_interval_ms() -> u64 {
    DEFAULT_RECEIPT_POLL_INTERVAL_MS
}

#[cfg(feature = "cli")]
fn default_rpc_address() -> String {
    DEFAULT_RPC_ADDRESS.to_owned()
}

#[cfg(feature = "cli")]
fn default_log_poll_interval_ms() -> u64 {
    DEFAULT_LOG_POLL_INTERVAL_MS
}

#[cfg(feature = "cli")]
fn default_log_filename() -> String {
    String::from("lir-wallet.log")
}

#[cfg(feature = "cli")]
fn default_logs_path() -> String {
    String::from("logs/")
}

// Settings of one wallet session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_contract_address")]
    pub contract_address: Address,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
}

impl SessionConfig {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            contract_address: default_contract_address(),
            event_capacity: default_event_capacity(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC node address to use
    #[clap(long, default_value_t = default_rpc_address())]
    #[serde(default = "default_rpc_address")]
    pub rpc_address: String,
    /// Address of the LIR token contract
    #[clap(long, value_parser = lir_common::address::parse_address)]
    pub contract_address: Option<Address>,
    /// Interval in milliseconds between two receipt requests
    #[clap(long, default_value_t = DEFAULT_RECEIPT_POLL_INTERVAL_MS)]
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Interval in milliseconds between two log requests
    #[clap(long, default_value_t = DEFAULT_LOG_POLL_INTERVAL_MS)]
    #[serde(default = "default_log_poll_interval_ms")]
    pub log_poll_interval_ms: u64,
}

#[cfg(feature = "cli")]
impl NetworkConfig {
    // Build the session settings from the command line
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            contract_address: self
                .contract_address
                .unwrap_or_else(default_contract_address),
            receipt_poll_interval_ms: self.receipt_poll_interval_ms,
            ..Default::default()
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct LogConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub log_level: LogLevel,
    /// Set file log level
    /// By default, it will be the same as log level
    #[clap(long, value_enum)]
    pub file_log_level: Option<LogLevel>,
    /// Disable the log file
    #[clap(long)]
    #[serde(default)]
    pub disable_file_logging: bool,
    /// Disable the log filename date based
    /// If disabled, the log file will be named lir-wallet.log instead of YYYY-MM-DD.lir-wallet.log
    #[clap(long)]
    #[serde(default)]
    pub disable_file_log_date_based: bool,
    /// Disable the usage of colors in log
    #[clap(long)]
    #[serde(default)]
    pub disable_log_color: bool,
    /// Log filename
    ///
    /// By default filename is lir-wallet.log.
    /// File will be stored in logs directory, this is only the filename, not the full path.
    #[clap(long, default_value_t = default_log_filename())]
    #[serde(default = "default_log_filename")]
    pub filename_log: String,
    /// Logs directory
    ///
    /// By default it will be logs/ of the current directory.
    /// It must end with a / to be a valid folder.
    #[clap(long, default_value_t = default_logs_path())]
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    /// Change the datetime format used by the logger
    #[clap(long, default_value_t = default_logs_datetime_format())]
    #[serde(default = "default_logs_datetime_format")]
    pub datetime_format: String,
}

#[cfg(feature = "cli")]
#[derive(Parser, Serialize, Deserialize, Clone)]
#[clap(
    version = VERSION,
    about = "LIR Wallet - Manage the LIR token from command line",
    long_about = r#"LIR Wallet - Non-Interactive Command Line Interface

Connects to a JSON-RPC node, loads the account roles and balances
and runs one command against the LIR token contract.

AVAILABLE COMMANDS (use with --exec):
  status                              - Show account, roles and balances
  watch <seconds>                     - Collect transfer events for some time
  set-manager <address> <true|false>  - Grant or revoke the manager role (admin)
  distribute <address> <amount>       - Send tokens from the contract to a manager (admin)
  reward <address> <amount>           - Reward a student (manager)
  burn <amount>                       - Burn tokens of the connected account

Example:
  ./lir_wallet --rpc-address http://127.0.0.1:8545 --exec "burn 1.5"
"#
)]
#[command(styles = lir_common::get_cli_styles())]
pub struct Config {
    #[clap(flatten)]
    #[serde(flatten)]
    pub network: NetworkConfig,
    #[clap(flatten)]
    #[serde(flatten)]
    pub log: LogConfig,
    /// Command to execute, the snapshot is printed as JSON afterwards
    #[clap(long, default_value = "status")]
    #[serde(default)]
    pub exec: Option<String>,
    /// JSON File to load the configuration from
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub config_file: Option<String>,
    /// Generate the template at the `config_file` path
    #[clap(long)]
    #[serde(skip)]
    #[serde(default)]
    pub generate_config_template: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_contract_address_is_valid() {
        let address = lir_common::address::parse_address(DEFAULT_CONTRACT_ADDRESS).unwrap();
        assert_eq!(SessionConfig::default().contract_address, address);
        assert_eq!(address.to_checksum(None), DEFAULT_CONTRACT_ADDRESS);
    }

    #[test]
    fn test_session_config_defaults_from_json() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.event_capacity, EVENT_LOG_CAPACITY);
        assert_eq!(config.receipt_poll_interval(), Duration::from_millis(1000));
    }
}
