//! Error taxonomy for the relay.
//!
//! Errors are scoped: `DecodeError` to one log, `SubmitError` to one event,
//! `RpcError` to one RPC operation. Whether an `RpcError` aborts the cycle
//! depends on its class: transient errors skip the affected block or mark
//! the affected event failed, permanent errors stop the cycle.

use thiserror::Error;

/// Failure of a single RPC operation against a chain endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Timeout, rate limit, flaky gateway. Scoped to the operation;
    /// the cycle continues.
    #[error("transient rpc error: {0}")]
    Transient(String),
    /// Bad address, malformed request, rejected filter. Retrying per-block
    /// is pointless; the cycle aborts.
    #[error("permanent rpc error: {0}")]
    Permanent(String),
}

impl RpcError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Transient(_))
    }

    /// Classify a transport-level error by message. Anything not clearly
    /// permanent is treated as transient so a flaky provider cannot wedge
    /// the scanner.
    pub fn classify(message: impl Into<String>) -> RpcError {
        let message = message.into();
        let lower = message.to_lowercase();

        let permanent = lower.contains("reverted")
            || lower.contains("invalid address")
            || lower.contains("invalid argument")
            || lower.contains("invalid params")
            || lower.contains("method not found")
            || lower.contains("filter not found")
            || lower.contains("invalid signature")
            || lower.contains("insufficient funds")
            || lower.contains("out of gas");

        if permanent {
            RpcError::Permanent(message)
        } else {
            RpcError::Transient(message)
        }
    }
}

/// Failure to decode one raw log against an event schema. Scoped to the log;
/// the cycle continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The log's first topic does not match the schema's canonical topic.
    #[error("schema mismatch: expected topic0 {expected}, got {got}")]
    SchemaMismatch { expected: String, got: String },
    /// The log carries no topics at all.
    #[error("log has no topics")]
    MissingTopics,
    /// No field matched the canonical name or any known alias, and
    /// positional recovery was not possible either.
    #[error("field {0:?} not found under any known name")]
    FieldNotFound(&'static str),
    /// A field was found but its ABI type is not what the relay expects.
    #[error("field {0:?} has an unexpected type")]
    TypeMismatch(&'static str),
    /// The payload did not decode against the schema at all.
    #[error("abi decode failed: {0}")]
    Abi(String),
    /// Amount must be strictly positive.
    #[error("zero amount")]
    ZeroAmount,
    /// The node returned a log without tx hash / block number / log index.
    /// Such a log cannot be deduplicated, so it is dropped.
    #[error("log is missing provenance ({0})")]
    MissingProvenance(&'static str),
}

/// Failure to submit one relay action. Scoped to the event; logged with its
/// provenance and not retried.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The nonce sequencer holds no counter. Submitting anyway would reuse
    /// or skip nonces, so the event is failed instead.
    #[error("nonce sequencer not resynced")]
    NonceUnavailable,
}
