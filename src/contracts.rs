//! Bridge vault call encoding.
//!
//! Uses alloy's sol! macro for type-safe calldata generation. Only the two
//! privileged warden functions are bound; event decoding is schema-driven
//! (see `decoder`) because the deployed contracts disagree on field names.

use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::types::{RelayAction, TargetFunction};

sol! {
    /// Privileged bridge vault interface, callable only by the warden.
    contract BridgeVault {
        /// Mint the wrapped representation on the destination chain.
        function wrap(address token, address recipient, uint256 amount) external;

        /// Release a previously locked asset on the source chain.
        function withdraw(address token, address recipient, uint256 amount) external;
    }
}

/// ABI-encode the calldata for a relay action.
pub fn encode_action(action: &RelayAction) -> Bytes {
    let encoded = match action.target_function {
        TargetFunction::Wrap => BridgeVault::wrapCall {
            token: action.token,
            recipient: action.recipient,
            amount: action.amount,
        }
        .abi_encode(),
        TargetFunction::Withdraw => BridgeVault::withdrawCall {
            token: action.token,
            recipient: action.recipient,
            amount: action.amount,
        }
        .abi_encode(),
    };
    Bytes::from(encoded)
}

/// Selector helper used in tests and logging.
pub fn selector(function: TargetFunction) -> [u8; 4] {
    match function {
        TargetFunction::Wrap => BridgeVault::wrapCall::SELECTOR,
        TargetFunction::Withdraw => BridgeVault::withdrawCall::SELECTOR,
    }
}

#[allow(unused_imports)]
pub use BridgeVault::{wrapCall, withdrawCall};
