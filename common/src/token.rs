//! ABI of the LIR token contract
//!
//! Calldata, return values and the `Transfer` event are generated by
//! `sol!` from the Solidity declarations of the deployed contract.

use alloy_sol_types::{sol, Panic, Revert, SolError};

sol! {
    /// Interface of the deployed LIR token contract
    #[derive(Debug)]
    interface ILirToken {
        function admin() external view returns (address);
        function managers(address account) external view returns (bool);
        function balanceOf(address account) external view returns (uint256);

        function setManager(address manager, bool status) external;
        function distributeToManager(address manager, uint256 amount) external;
        function rewardStudent(address student, uint256 amount) external;
        function burnTokens(uint256 amount) external;

        event Transfer(address indexed from, address indexed to, uint256 value);
    }
}

pub use ILirToken::Transfer;

// Reason of a reverted call from its return data
// Returns None for custom errors or empty revert data
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(data, true) {
        return Some(revert.reason);
    }

    Panic::abi_decode(data, true)
        .ok()
        .map(|panic| format!("panic: code 0x{:x}", panic.code))
}

// `Error(string)` payload, as thrown by `require(condition, reason)`
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    Revert {
        reason: reason.to_owned(),
    }
    .abi_encode()
}
