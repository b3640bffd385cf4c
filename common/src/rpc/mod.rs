mod error;
mod types;

pub use error::*;
pub use types::*;

pub const JSON_RPC_VERSION: &str = "2.0";
