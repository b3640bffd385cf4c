use alloy_primitives::U256;
use lazy_static::lazy_static;

pub const VERSION: &str = env!("BUILD_VERSION");

// 18 decimals numbers, as every ERC-20 style token
pub const COIN_DECIMALS: u8 = 18;

// Symbol displayed next to every amount
pub const TOKEN_SYMBOL: &str = "LIR";

lazy_static! {
    // 10^18 to represent 1 LIR
    pub static ref COIN_VALUE: U256 = U256::from(10u64).pow(U256::from(COIN_DECIMALS));
}
