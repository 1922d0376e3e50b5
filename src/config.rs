//! Static relay configuration.
//!
//! Contract addresses, ABIs and warden keys come from `contract_info.json`
//! (one block per chain); RPC endpoints and tunables come from environment
//! variables, with a `.env` file honored when present. A chain without a
//! warden key stays a valid configuration: it becomes a dry-run submission
//! target.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::json_abi::{Event, JsonAbi};
use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;

use crate::types::Chain;

// Defaults follow the original testnet deployment.
const DEFAULT_SOURCE_RPC: &str = "https://api.avax-test.network/ext/bc/C/rpc";
const DEFAULT_DESTINATION_RPC: &str = "https://bsc-testnet.publicnode.com";
const DEFAULT_CONTRACT_INFO: &str = "contract_info.json";

fn default_scan_lag() -> u64 {
    5
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

/// Complete configuration for both directions.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub source: ChainConfig,
    pub destination: ChainConfig,
    pub relay: RelaySettings,
}

/// One chain's static configuration.
#[derive(Clone)]
pub struct ChainConfig {
    pub chain: Chain,
    pub rpc_url: String,
    /// Bridge vault contract emitting the watched event.
    pub address: Address,
    pub abi: JsonAbi,
    /// Resolved schema of the event this chain is scanned for.
    pub event: Event,
    pub warden_private_key: Option<String>,
}

/// Custom Debug that redacts the warden key (and elides the ABI).
impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("chain", &self.chain)
            .field("rpc_url", &self.rpc_url)
            .field("address", &self.address)
            .field("event", &self.event.name)
            .field(
                "warden_private_key",
                &self.warden_private_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Engine tunables from the environment.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Scan window lag N: each cycle covers `[max(0, latest - N), latest]`.
    pub scan_lag: u64,
    pub rpc_timeout: Duration,
    pub poll_interval: Duration,
    /// Optional CSV audit log path.
    pub event_log_file: Option<PathBuf>,
}

impl RelaySettings {
    pub fn from_env() -> Self {
        Self {
            scan_lag: env_parse("SCAN_LAG", default_scan_lag()),
            rpc_timeout: Duration::from_millis(env_parse(
                "RPC_TIMEOUT_MS",
                default_rpc_timeout_ms(),
            )),
            poll_interval: Duration::from_millis(env_parse(
                "POLL_INTERVAL_MS",
                default_poll_interval_ms(),
            )),
            event_log_file: env::var("EVENT_LOG_FILE").ok().map(PathBuf::from),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// On-disk shape of one chain's block in contract_info.json.
#[derive(Deserialize)]
struct ChainInfoFile {
    address: String,
    abi: JsonAbi,
    #[serde(default)]
    warden_private_key: Option<String>,
    /// Optional override of the watched event name.
    #[serde(default)]
    event: Option<String>,
}

#[derive(Deserialize)]
struct ContractInfoFile {
    source: ChainInfoFile,
    destination: ChainInfoFile,
}

impl BridgeConfig {
    /// Load `.env` (if present), then the contract info file named by
    /// `CONTRACT_INFO`, then environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = env::var("CONTRACT_INFO").unwrap_or_else(|_| DEFAULT_CONTRACT_INFO.to_string());
        Self::load_from_file(Path::new(&path))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read contract info from {}", path.display()))?;
        let file: ContractInfoFile = serde_json::from_str(&raw)
            .wrap_err_with(|| format!("Malformed contract info in {}", path.display()))?;

        let source = ChainConfig::from_file(
            Chain::Source,
            file.source,
            env::var("SOURCE_RPC_URL").unwrap_or_else(|_| DEFAULT_SOURCE_RPC.to_string()),
        )?;
        let destination = ChainConfig::from_file(
            Chain::Destination,
            file.destination,
            env::var("DESTINATION_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_DESTINATION_RPC.to_string()),
        )?;

        let config = BridgeConfig {
            source,
            destination,
            relay: RelaySettings::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn chain(&self, chain: Chain) -> &ChainConfig {
        match chain {
            Chain::Source => &self.source,
            Chain::Destination => &self.destination,
        }
    }

    fn validate(&self) -> Result<()> {
        for cfg in [&self.source, &self.destination] {
            if let Some(key) = &cfg.warden_private_key {
                if key.len() != 66 || !key.starts_with("0x") || hex::decode(&key[2..]).is_err() {
                    return Err(eyre!(
                        "{}.warden_private_key must be 0x followed by 64 hex chars",
                        cfg.chain
                    ));
                }
            }
            if cfg.rpc_url.is_empty() {
                return Err(eyre!("{}.rpc_url cannot be empty", cfg.chain));
            }
        }
        if self.relay.scan_lag > 10_000 {
            return Err(eyre!("SCAN_LAG is unreasonably large"));
        }
        Ok(())
    }
}

impl ChainConfig {
    fn from_file(chain: Chain, file: ChainInfoFile, rpc_url: String) -> Result<Self> {
        let address: Address = file
            .address
            .parse()
            .wrap_err_with(|| format!("Invalid {chain} contract address: {}", file.address))?;

        let event_name = file
            .event
            .unwrap_or_else(|| chain.watched_event().event_name().to_string());
        let event = file
            .abi
            .events
            .get(&event_name)
            .and_then(|overloads| overloads.first())
            .cloned()
            .ok_or_else(|| eyre!("{chain} abi has no event named {event_name:?}"))?;

        Ok(ChainConfig {
            chain,
            rpc_url,
            address,
            abi: file.abi,
            event,
            warden_private_key: file.warden_private_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ADDRESS: &str = "0x1111111111111111111111111111111111111111";
    const KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    fn contract_info(source_key: Option<&str>, dest_key: Option<&str>) -> serde_json::Value {
        let deposit_abi = serde_json::json!([{
            "type": "event",
            "name": "Deposit",
            "anonymous": false,
            "inputs": [
                {"name": "token", "type": "address", "indexed": true, "internalType": "address"},
                {"name": "recipient", "type": "address", "indexed": true, "internalType": "address"},
                {"name": "amount", "type": "uint256", "indexed": false, "internalType": "uint256"},
            ],
        }]);
        let unwrap_abi = serde_json::json!([{
            "type": "event",
            "name": "Unwrap",
            "anonymous": false,
            "inputs": [
                {"name": "underlying_token", "type": "address", "indexed": true, "internalType": "address"},
                {"name": "to", "type": "address", "indexed": true, "internalType": "address"},
                {"name": "amount", "type": "uint256", "indexed": false, "internalType": "uint256"},
            ],
        }]);
        serde_json::json!({
            "source": {
                "address": ADDRESS,
                "abi": deposit_abi,
                "warden_private_key": source_key,
            },
            "destination": {
                "address": ADDRESS,
                "abi": unwrap_abi,
                "warden_private_key": dest_key,
            },
        })
    }

    fn write_temp(value: &serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    #[test]
    fn test_load_resolves_event_schemas() {
        let file = write_temp(&contract_info(Some(KEY), Some(KEY)));
        let config = BridgeConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.source.event.name, "Deposit");
        assert_eq!(config.destination.event.name, "Unwrap");
        assert_eq!(config.source.address, ADDRESS.parse::<Address>().unwrap());
    }

    #[test]
    fn test_missing_key_is_valid_dry_run_config() {
        let file = write_temp(&contract_info(Some(KEY), None));
        let config = BridgeConfig::load_from_file(file.path()).unwrap();
        assert!(config.destination.warden_private_key.is_none());
    }

    #[test]
    fn test_short_key_rejected() {
        let file = write_temp(&contract_info(Some("0x123"), None));
        assert!(BridgeConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_non_hex_key_rejected() {
        let bad = format!("0x{}", "zz".repeat(32));
        let file = write_temp(&contract_info(Some(&bad), None));
        assert!(BridgeConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_bad_address_rejected() {
        let mut info = contract_info(None, None);
        info["source"]["address"] = serde_json::json!("not-an-address");
        let file = write_temp(&info);
        assert!(BridgeConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_abi_without_watched_event_rejected() {
        let mut info = contract_info(None, None);
        info["destination"]["abi"] = serde_json::json!([]);
        let file = write_temp(&info);
        assert!(BridgeConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_debug_redacts_warden_key() {
        let file = write_temp(&contract_info(Some(KEY), None));
        let config = BridgeConfig::load_from_file(file.path()).unwrap();
        let debug = format!("{:?}", config.source);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&KEY[10..30]));
    }
}
