//! Per-chain RPC gateway.
//!
//! The engine talks to chains only through the `ChainClient` trait so cycles
//! can be exercised against in-memory fakes. The production implementation
//! wraps an alloy HTTP provider; every call is bounded by a timeout and maps
//! transport failures into the transient/permanent taxonomy.

use std::future::{Future, IntoFuture};
use std::time::Duration;

use alloy::eips::BlockId;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{Client, Http};
use alloy::transports::TransportResult;
use async_trait::async_trait;
use eyre::{Result, WrapErr};

use crate::error::RpcError;

/// One outgoing call, fully resolved by the engine. The client only signs
/// and broadcasts; it never chooses nonces or gas.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub to: Address,
    pub calldata: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
}

/// RPC capability of one chain endpoint.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64, RpcError>;

    /// Fetch logs for a contract over an inclusive block range, optionally
    /// filtered by event topic.
    async fn logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
        topic0: Option<B256>,
    ) -> Result<Vec<Log>, RpcError>;

    /// Transaction count including pending, for nonce resync.
    async fn pending_transaction_count(&self, address: Address) -> Result<u64, RpcError>;

    async fn gas_price(&self) -> Result<u128, RpcError>;

    /// Sign and broadcast. Returns the transaction hash without waiting for
    /// inclusion.
    async fn sign_and_send(&self, request: SubmissionRequest) -> Result<B256, RpcError>;

    /// The warden account, if this chain is configured as a submission
    /// target. `None` means dry-run: actions are computed and logged only.
    fn warden_address(&self) -> Option<Address>;
}

/// `ChainClient` over an alloy HTTP provider.
pub struct EvmChainClient {
    rpc_url: String,
    provider: RootProvider<Http<Client>>,
    signer: Option<PrivateKeySigner>,
    timeout: Duration,
}

impl EvmChainClient {
    pub fn new(rpc_url: &str, warden_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let url = rpc_url.parse().wrap_err("Failed to parse RPC URL")?;
        let provider = ProviderBuilder::new().on_http(url);

        let signer = warden_key
            .map(|key| key.parse::<PrivateKeySigner>())
            .transpose()
            .wrap_err("Invalid warden private key")?;

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            provider,
            signer,
            timeout,
        })
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = TransportResult<T>> + Send,
    ) -> Result<T, RpcError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(RpcError::classify(format!("{op}: {e}"))),
            Err(_) => Err(RpcError::Transient(format!(
                "{op} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    async fn latest_block_number(&self) -> Result<u64, RpcError> {
        self.bounded("get_block_number", self.provider.get_block_number())
            .await
    }

    async fn logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
        topic0: Option<B256>,
    ) -> Result<Vec<Log>, RpcError> {
        let mut filter = Filter::new()
            .address(address)
            .from_block(from_block)
            .to_block(to_block);
        if let Some(topic0) = topic0 {
            filter = filter.event_signature(topic0);
        }
        self.bounded("get_logs", self.provider.get_logs(&filter))
            .await
    }

    async fn pending_transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        self.bounded(
            "get_transaction_count",
            self.provider
                .get_transaction_count(address)
                .block_id(BlockId::pending())
                .into_future(),
        )
        .await
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.bounded("get_gas_price", self.provider.get_gas_price())
            .await
    }

    async fn sign_and_send(&self, request: SubmissionRequest) -> Result<B256, RpcError> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| RpcError::Permanent("no warden key for this chain".into()))?;

        // Signing providers are cheap to assemble and carry the wallet
        // filler state, so one is built per broadcast.
        let url = self
            .rpc_url
            .parse()
            .map_err(|_| RpcError::Permanent(format!("invalid rpc url: {}", self.rpc_url)))?;
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);

        let tx = TransactionRequest::default()
            .with_to(request.to)
            .with_input(request.calldata)
            .with_nonce(request.nonce)
            .with_gas_limit(request.gas_limit)
            .with_gas_price(request.gas_price);

        let pending = self
            .bounded("send_transaction", provider.send_transaction(tx))
            .await?;
        Ok(*pending.tx_hash())
    }

    fn warden_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }
}
