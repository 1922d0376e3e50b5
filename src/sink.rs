//! Append-only audit log of relayed events.
//!
//! Purely for offline audit; the engine never reads it back and a sink
//! write failure never affects a cycle. CSV with a header written on file
//! creation.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy::primitives::{Address, B256, U256};
use chrono::Utc;
use eyre::{Result, WrapErr};

use crate::types::Chain;

/// One audit row, recorded after an event is decoded and deduplicated.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub chain: Chain,
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
    /// Hash of the transaction the event was observed in.
    pub tx_hash: B256,
    /// The bridge contract that emitted the event.
    pub contract_address: Address,
}

/// Append-only audit capability.
pub trait EventSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<()>;
}

const HEADER: &str = "timestamp,chain,token,recipient,amount,transaction_hash,address\n";

/// CSV file sink. Rows are flushed per append so a crash loses at most the
/// in-flight record.
pub struct CsvEventSink {
    path: PathBuf,
}

impl CsvEventSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl EventSink for CsvEventSink {
    fn append(&self, record: &AuditRecord) -> Result<()> {
        let new_file = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .wrap_err_with(|| format!("Failed to open audit log {}", self.path.display()))?;

        if new_file {
            file.write_all(HEADER.as_bytes())?;
        }
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            Utc::now().to_rfc3339(),
            record.chain,
            record.token,
            record.recipient,
            record.amount,
            record.tx_hash,
            record.contract_address,
        )?;
        file.flush()?;
        Ok(())
    }
}
