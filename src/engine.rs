//! The relay engine: one scan cycle per invocation.
//!
//! A cycle for a given chain walks four phases: scan the block window for
//! raw logs, decode them, deduplicate, then submit the mapped actions to
//! the opposite chain in blockchain order. Failure isolation is per-block
//! for scanning (transient only), per-log for decoding and per-event for
//! submission; permanent RPC errors and nonce resync failures abort the
//! cycle before any chain write.

use std::sync::Arc;

use alloy::json_abi::Event;
use alloy::primitives::Address;
use alloy::rpc::types::Log;
use eyre::{eyre, Result};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chain::{ChainClient, EvmChainClient, SubmissionRequest};
use crate::config::BridgeConfig;
use crate::contracts;
use crate::dedup::SeenSet;
use crate::decoder;
use crate::error::{DecodeError, SubmitError};
use crate::mapper;
use crate::nonce::NonceSequencer;
use crate::sink::{AuditRecord, EventSink};
use crate::types::{
    BridgeEvent, Chain, CycleReport, RelayAction, ScanWindow, SignedSubmission,
};

/// Fixed gas limit for warden calls; wrap and withdraw are small mints and
/// transfers, far below this ceiling.
pub const GAS_LIMIT: u64 = 500_000;

/// Everything the engine needs to talk to one chain.
pub struct EndpointSpec {
    pub client: Arc<dyn ChainClient>,
    pub contract: Address,
    pub schema: Event,
}

struct Endpoint {
    chain: Chain,
    client: Arc<dyn ChainClient>,
    contract: Address,
    schema: Event,
    sequencer: NonceSequencer,
    /// At most one in-flight cycle per chain, by construction.
    cycle_lock: Mutex<()>,
}

impl Endpoint {
    fn new(chain: Chain, spec: EndpointSpec) -> Self {
        Self {
            chain,
            client: spec.client,
            contract: spec.contract,
            schema: spec.schema,
            sequencer: NonceSequencer::new(),
            cycle_lock: Mutex::new(()),
        }
    }
}

/// Orchestrates scan cycles for both directions. Stateless between cycles
/// except for the dedup set and the per-chain nonce counters.
pub struct RelayEngine {
    source: Endpoint,
    destination: Endpoint,
    seen: Arc<SeenSet>,
    sink: Option<Box<dyn EventSink>>,
    scan_lag: u64,
}

impl RelayEngine {
    pub fn new(source: EndpointSpec, destination: EndpointSpec, scan_lag: u64) -> Self {
        Self {
            source: Endpoint::new(Chain::Source, source),
            destination: Endpoint::new(Chain::Destination, destination),
            seen: Arc::new(SeenSet::default()),
            sink: None,
            scan_lag,
        }
    }

    /// Build an engine with live EVM clients from a loaded configuration.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let mut engine = Self::new(
            endpoint_spec(config, Chain::Source)?,
            endpoint_spec(config, Chain::Destination)?,
            config.relay.scan_lag,
        );
        if let Some(path) = &config.relay.event_log_file {
            engine = engine.with_sink(Box::new(crate::sink::CsvEventSink::new(path)));
        }
        Ok(engine)
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn endpoint(&self, chain: Chain) -> &Endpoint {
        match chain {
            Chain::Source => &self.source,
            Chain::Destination => &self.destination,
        }
    }

    /// Run one scan cycle for `chain`, submitting to the opposite chain.
    pub async fn scan(&self, chain: Chain) -> Result<CycleReport> {
        let watched = self.endpoint(chain);
        let target = self.endpoint(chain.opposite());
        let _cycle = watched.cycle_lock.lock().await;

        let mut report = CycleReport::default();
        let dry_run = target.client.warden_address().is_none();

        // Resync the target nonce once per cycle, before anything else.
        // Partial nonce state must never be used, so a resync failure
        // aborts the cycle with no submissions attempted.
        if let Some(warden) = target.client.warden_address() {
            let pending = target
                .client
                .pending_transaction_count(warden)
                .await
                .map_err(|e| eyre!("nonce resync failed on {}: {e}", target.chain))?;
            target.sequencer.resync(pending);
        }

        // Phase 1: scanning.
        let latest = watched
            .client
            .latest_block_number()
            .await
            .map_err(|e| eyre!("failed to read {} head: {e}", watched.chain))?;
        let window = ScanWindow::from_head(latest, self.scan_lag);
        info!(chain = %chain, window = %window, "Scanning window");

        let raw_logs = self.fetch_window(watched, window, &mut report).await?;
        report.logs_fetched = raw_logs.len();

        // Phases 2+3: decoding and deduplication.
        let events = self.decode_and_dedup(watched, chain, &raw_logs, &mut report);

        // Phase 4: submission, in blockchain order.
        for event in events {
            let action = mapper::map(&event);
            if dry_run {
                info!(
                    chain = %target.chain,
                    function = %action.target_function,
                    token = %action.token,
                    recipient = %action.recipient,
                    amount = %action.amount,
                    source_tx = %event.tx_hash,
                    "No warden key for target chain, dry-run only"
                );
                report.dry_run += 1;
                continue;
            }
            match self.submit(target, &action).await {
                Ok(submission) => {
                    info!(
                        chain = %target.chain,
                        function = %action.target_function,
                        nonce = submission.nonce,
                        tx_hash = %submission.tx_hash,
                        "Submitted relay transaction"
                    );
                    report.submitted += 1;
                    report.submissions.push(submission);
                }
                Err(e) => {
                    // Terminal for this event; provenance logged for
                    // manual replay.
                    error!(
                        chain = %target.chain,
                        function = %action.target_function,
                        source_tx = %event.tx_hash,
                        log_index = event.log_index,
                        block = event.block_number,
                        error = %e,
                        "Submission failed, event will not be retried"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(chain = %chain, %report, "Cycle complete");
        Ok(report)
    }

    /// Fetch logs block by block. Some public providers reject wide ranged
    /// filters, and a single flaky block must not block the rest of the
    /// window: transient failures skip the block, permanent ones abort.
    async fn fetch_window(
        &self,
        watched: &Endpoint,
        window: ScanWindow,
        report: &mut CycleReport,
    ) -> Result<Vec<Log>> {
        let topic0 = watched.schema.selector();
        let mut raw_logs = Vec::new();
        for block in window.blocks() {
            match watched
                .client
                .logs(watched.contract, block, block, Some(topic0))
                .await
            {
                Ok(logs) => raw_logs.extend(logs),
                Err(e) if e.is_transient() => {
                    warn!(chain = %watched.chain, block, error = %e, "Skipping block");
                    report.blocks_skipped += 1;
                }
                Err(e) => {
                    return Err(eyre!(
                        "permanent rpc failure scanning {} block {block}: {e}",
                        watched.chain
                    ))
                }
            }
        }
        Ok(raw_logs)
    }

    fn decode_and_dedup(
        &self,
        watched: &Endpoint,
        chain: Chain,
        raw_logs: &[Log],
        report: &mut CycleReport,
    ) -> Vec<BridgeEvent> {
        let kind = chain.watched_event();
        let mut events = Vec::new();
        for log in raw_logs {
            match decoder::decode(chain, kind, log, &watched.schema) {
                Ok(event) => {
                    report.events_decoded += 1;
                    if event.via_positional {
                        warn!(
                            chain = %chain,
                            tx_hash = %event.tx_hash,
                            log_index = event.log_index,
                            "Event decoded positionally, check the configured ABI"
                        );
                    }
                    // Dedup is recorded at decode time: a later submission
                    // failure is terminal, never replayed.
                    if !self.seen.insert_if_absent(event.id()) {
                        debug!(
                            chain = %chain,
                            tx_hash = %event.tx_hash,
                            log_index = event.log_index,
                            "Already seen, skipping"
                        );
                        report.duplicates_skipped += 1;
                        continue;
                    }
                    self.audit(watched, &event);
                    events.push(event);
                }
                Err(e @ DecodeError::SchemaMismatch { .. }) => {
                    // The fetch filter targets this event's topic, so a
                    // mismatch here is worth surfacing.
                    warn!(
                        chain = %chain,
                        tx_hash = ?log.transaction_hash,
                        log_index = ?log.log_index,
                        error = %e,
                        "Log does not match targeted event schema"
                    );
                }
                Err(e) => {
                    debug!(
                        chain = %chain,
                        tx_hash = ?log.transaction_hash,
                        log_index = ?log.log_index,
                        error = %e,
                        "Dropping undecodable log"
                    );
                }
            }
        }
        // Source-chain causal order: ascending block, then log index.
        events.sort_by_key(|e| (e.block_number, e.log_index));
        events
    }

    async fn submit(
        &self,
        target: &Endpoint,
        action: &RelayAction,
    ) -> std::result::Result<SignedSubmission, SubmitError> {
        let gas_price = target.client.gas_price().await?;
        let nonce = target
            .sequencer
            .next()
            .ok_or(SubmitError::NonceUnavailable)?;
        let request = SubmissionRequest {
            to: target.contract,
            calldata: contracts::encode_action(action),
            nonce,
            gas_limit: GAS_LIMIT,
            gas_price,
        };
        let tx_hash = target.client.sign_and_send(request).await?;
        Ok(SignedSubmission {
            nonce,
            gas_limit: GAS_LIMIT,
            gas_price,
            tx_hash,
        })
    }

    fn audit(&self, watched: &Endpoint, event: &BridgeEvent) {
        let Some(sink) = &self.sink else { return };
        let record = AuditRecord {
            chain: event.chain,
            token: event.token,
            recipient: event.recipient,
            amount: event.amount,
            tx_hash: event.tx_hash,
            contract_address: watched.contract,
        };
        if let Err(e) = sink.append(&record) {
            warn!(error = %e, "Audit sink write failed");
        }
    }
}

fn endpoint_spec(config: &BridgeConfig, chain: Chain) -> Result<EndpointSpec> {
    let cfg = config.chain(chain);
    let client = EvmChainClient::new(
        &cfg.rpc_url,
        cfg.warden_private_key.as_deref(),
        config.relay.rpc_timeout,
    )?;
    Ok(EndpointSpec {
        client: Arc::new(client),
        contract: cfg.address,
        schema: cfg.event.clone(),
    })
}
