//! Read-only contract calls
//!
//! Every read resolves to either return data or [`Unavailable`]. Reverts,
//! ABI mismatches and timeouts are ordinary outcomes here: most addresses a
//! wallet holds are not the contract type being probed.

pub mod abi;

use crate::config::RpcSettings;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Why a single contract read produced no value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unavailable {
    #[error("call reverted: {0}")]
    Reverted(String),

    #[error("empty return data")]
    EmptyReturn,

    #[error("could not decode return data: {0}")]
    Decode(String),

    #[error("call timed out after {0} ms")]
    Timeout(u64),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Generic read-only contract call collaborator
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Execute `eth_call` of `input` against `to` at the latest block
    async fn call(&self, to: Address, input: Bytes) -> std::result::Result<Bytes, Unavailable>;
}

/// [`ContractReader`] backed by a JSON-RPC endpoint
pub struct RpcReader {
    provider: DynProvider,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl RpcReader {
    /// Create a reader for an RPC URL
    pub fn new(rpc_url: &str, settings: &RpcSettings) -> Result<Self> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))?;

        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            timeout: Duration::from_millis(settings.call_timeout_ms),
            permits: Arc::new(Semaphore::new(settings.max_concurrent_calls.max(1))),
        })
    }
}

#[async_trait]
impl ContractReader for RpcReader {
    async fn call(&self, to: Address, input: Bytes) -> std::result::Result<Bytes, Unavailable> {
        // The semaphore is never closed
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Unavailable::Transport(e.to_string()))?;

        let tx = TransactionRequest::default().to(to).input(input.into());

        match tokio::time::timeout(self.timeout, self.provider.call(tx)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(classify_rpc_error(&e.to_string())),
            Err(_) => Err(Unavailable::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

/// Sort an RPC error message into a revert or a transport failure
fn classify_rpc_error(error: &str) -> Unavailable {
    if !error.contains("revert") {
        return Unavailable::Transport(error.to_string());
    }

    if let Some(start) = error.find("revert: ") {
        let reason = &error[start + 8..];
        let reason = reason.split('"').next().unwrap_or(reason);
        return Unavailable::Reverted(reason.to_string());
    }

    Unavailable::Reverted("execution reverted".to_string())
}
