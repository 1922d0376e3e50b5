//! Warden relay between two EVM bridge contracts.
//!
//! Observes `Deposit` events on the source chain and issues `wrap` calls on
//! the destination, observes `Unwrap` events on the destination and issues
//! `withdraw` calls on the source. Single-signer, at-least-once semantics:
//! deduplication and nonce state live in process memory only.

pub mod chain;
pub mod config;
pub mod contracts;
pub mod decoder;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod nonce;
pub mod sink;
pub mod types;

pub use chain::{ChainClient, EvmChainClient, SubmissionRequest};
pub use config::BridgeConfig;
pub use engine::{EndpointSpec, RelayEngine, GAS_LIMIT};
pub use types::{BridgeEvent, Chain, CycleReport, EventKind, RelayAction, TargetFunction};
