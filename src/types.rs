//! Core data model for the relay: observed events, the actions they map to,
//! and per-cycle bookkeeping records.

use std::fmt;

use alloy::primitives::{Address, B256, U256};

/// The two ledgers the relay bridges. Naming follows the deployment: assets
/// are locked on `Source` and represented on `Destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Source,
    Destination,
}

impl Chain {
    /// The chain a scan cycle submits to.
    pub fn opposite(&self) -> Chain {
        match self {
            Chain::Source => Chain::Destination,
            Chain::Destination => Chain::Source,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Source => "source",
            Chain::Destination => "destination",
        }
    }

    /// Parse a chain name from the CLI / config. Only the two canonical
    /// names are accepted.
    pub fn parse(name: &str) -> Option<Chain> {
        match name {
            "source" => Some(Chain::Source),
            "destination" => Some(Chain::Destination),
            _ => None,
        }
    }

    /// Which bridge event each chain is watched for.
    pub fn watched_event(&self) -> EventKind {
        match self {
            Chain::Source => EventKind::Deposit,
            Chain::Destination => EventKind::Unwrap,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The event kinds the relay recognizes. Anything else is decoder noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Deposit,
    Unwrap,
}

impl EventKind {
    /// Canonical event name as it appears in the contract ABI.
    pub fn event_name(&self) -> &'static str {
        match self {
            EventKind::Deposit => "Deposit",
            EventKind::Unwrap => "Unwrap",
        }
    }
}

/// The privileged vault function a relay action invokes on the opposite chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFunction {
    Wrap,
    Withdraw,
}

impl TargetFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFunction::Wrap => "wrap",
            TargetFunction::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for TargetFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identity of an observed log entry, used for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    pub tx_hash: B256,
    pub log_index: u64,
}

/// An observed on-chain occurrence, decoded from a raw log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEvent {
    /// Chain the event was observed on.
    pub chain: Chain,
    pub kind: EventKind,
    /// The underlying asset address on the source chain.
    pub token: Address,
    /// Beneficiary on the opposite chain.
    pub recipient: Address,
    /// Always > 0; zero-amount logs are dropped at decode time.
    pub amount: U256,
    pub tx_hash: B256,
    pub block_number: u64,
    pub log_index: u64,
    /// True when named decoding was unavailable and fields were recovered
    /// by position. Surfaced in logs so degraded ABIs are visible.
    pub via_positional: bool,
}

impl BridgeEvent {
    pub fn id(&self) -> EventId {
        EventId {
            tx_hash: self.tx_hash,
            log_index: self.log_index,
        }
    }
}

/// The call to perform on the opposite chain. One action per event, no
/// batching and no splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayAction {
    pub target_function: TargetFunction,
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
}

/// Inclusive block range examined in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub start_block: u64,
    pub end_block: u64,
}

impl ScanWindow {
    /// `[max(0, latest - lag), latest]`.
    pub fn from_head(latest: u64, lag: u64) -> ScanWindow {
        ScanWindow {
            start_block: latest.saturating_sub(lag),
            end_block: latest,
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = u64> {
        self.start_block..=self.end_block
    }
}

impl fmt::Display for ScanWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start_block, self.end_block)
    }
}

/// Record of one outgoing call, kept for observability and nonce bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSubmission {
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub tx_hash: B256,
}

/// Outcome counters for a single scan cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub logs_fetched: usize,
    pub events_decoded: usize,
    pub duplicates_skipped: usize,
    pub submitted: usize,
    pub failed: usize,
    /// Blocks whose log fetch failed transiently and were skipped.
    pub blocks_skipped: usize,
    /// Actions computed but not sent because the target chain has no
    /// warden key configured.
    pub dry_run: usize,
    pub submissions: Vec<SignedSubmission>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "logs={} decoded={} duplicates={} submitted={} failed={} skipped_blocks={} dry_run={}",
            self.logs_fetched,
            self.events_decoded,
            self.duplicates_skipped,
            self.submitted,
            self.failed,
            self.blocks_skipped,
            self.dry_run
        )
    }
}
