//! Wallet token balance listing
//!
//! The indexer reports every ERC20 the wallet has touched, LP token or not.
//! A failure here is the one failure that fails a whole positions request.

use crate::config::IndexerSettings;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// One token balance as reported by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBalance {
    pub contract_address: Address,
    pub raw_balance_hex: String,
}

impl RawBalance {
    pub fn new(contract_address: Address, raw_balance_hex: impl Into<String>) -> Self {
        Self {
            contract_address,
            raw_balance_hex: raw_balance_hex.into(),
        }
    }

    /// Parsed balance; `None` when the hex string is malformed
    ///
    /// `""`, `"0x"` and any run of zero digits parse as zero.
    pub fn amount(&self) -> Option<U256> {
        let hex = self.raw_balance_hex.trim();
        let digits = hex
            .strip_prefix("0x")
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        if digits.is_empty() {
            return Some(U256::ZERO);
        }
        U256::from_str_radix(digits, 16).ok()
    }

    /// Whether this balance can be an LP position at all
    pub fn is_candidate(&self) -> bool {
        self.amount().is_some_and(|amount| !amount.is_zero())
    }
}

/// Chain-indexing collaborator listing a wallet's token balances
#[async_trait]
pub trait BalanceIndexer: Send + Sync {
    /// List token balances for `wallet`
    ///
    /// Implementations may stop early once `wanted` non-zero balances have
    /// been collected.
    async fn token_balances(&self, wallet: Address, wanted: usize) -> Result<Vec<RawBalance>>;
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalancesPage {
    token_balances: Vec<TokenBalanceEntry>,
    page_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalanceEntry {
    contract_address: Option<Address>,
    token_balance: Option<String>,
    error: Option<serde_json::Value>,
}

/// [`BalanceIndexer`] backed by Alchemy's `alchemy_getTokenBalances`
pub struct AlchemyIndexer {
    client: Client,
    url: String,
    page_size: u32,
    max_pages: u32,
}

impl AlchemyIndexer {
    /// Create an indexer for an Alchemy endpoint URL
    pub fn new(url: &str, settings: &IndexerSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            page_size: settings.page_size.max(1),
            max_pages: settings.max_pages.max(1),
        })
    }

    async fn fetch_page(
        &self,
        wallet: Address,
        page_key: Option<&str>,
    ) -> Result<TokenBalancesPage> {
        let mut options = json!({ "maxCount": self.page_size });
        if let Some(key) = page_key {
            options["pageKey"] = json!(key);
        }

        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "alchemy_getTokenBalances",
                "params": [wallet, "erc20", options]
            }))
            .send()
            .await
            .map_err(|e| Error::Indexer(format!("request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(Error::Indexer(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let body: JsonRpcResponse<TokenBalancesPage> = response
            .json()
            .await
            .map_err(|e| Error::Indexer(format!("malformed response: {}", e.without_url())))?;

        if let Some(error) = body.error {
            return Err(Error::Indexer(format!(
                "JSON-RPC error {}: {}",
                error.code, error.message
            )));
        }

        body.result
            .ok_or_else(|| Error::Indexer("no result in response".to_string()))
    }
}

#[async_trait]
impl BalanceIndexer for AlchemyIndexer {
    async fn token_balances(&self, wallet: Address, wanted: usize) -> Result<Vec<RawBalance>> {
        let mut balances = Vec::new();
        let mut page_key: Option<String> = None;

        for page in 0..self.max_pages {
            let result = self.fetch_page(wallet, page_key.as_deref()).await?;

            balances.extend(result.token_balances.into_iter().filter_map(|entry| {
                if entry.error.as_ref().is_some_and(|e| !e.is_null()) {
                    return None;
                }
                Some(RawBalance::new(entry.contract_address?, entry.token_balance?))
            }));

            tracing::debug!(
                wallet = %wallet,
                page,
                balances = balances.len(),
                "Fetched token balance page"
            );

            let non_zero = balances.iter().filter(|b| b.is_candidate()).count();
            match result.page_key {
                Some(key) if non_zero < wanted => page_key = Some(key),
                _ => break,
            }
        }

        Ok(balances)
    }
}
