//! Event-to-action mapping.
//!
//! The correspondence is fixed: a Deposit observed on the source chain mints
//! on the destination (`wrap`), an Unwrap observed on the destination chain
//! releases on the source (`withdraw`). The mapping is total over valid
//! events; unrecognized kinds never reach this point (decoder-level error).

use crate::types::{BridgeEvent, EventKind, RelayAction, TargetFunction};

/// Map an observed event to the call to issue on the opposite chain.
pub fn map(event: &BridgeEvent) -> RelayAction {
    let target_function = match event.kind {
        EventKind::Deposit => TargetFunction::Wrap,
        EventKind::Unwrap => TargetFunction::Withdraw,
    };
    RelayAction {
        target_function,
        token: event.token,
        recipient: event.recipient,
        amount: event.amount,
    }
}
