//! Best-effort USD token prices
//!
//! A lookup either returns a price or `None`. Non-success statuses (rate
//! limiting included), network errors, timeouts and missing fields all map to
//! `None`; nothing is retried.

use crate::config::{Network, PriceSettings};
use crate::Result;
use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// USD unit price collaborator
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// USD price of one whole token, if known
    async fn usd_price(&self, token: Address) -> Option<f64>;
}

/// CoinGecko contract endpoint response, reduced to the fields read here
#[derive(Debug, Deserialize)]
struct ContractResponse {
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    current_price: Option<CurrentPrice>,
}

#[derive(Debug, Deserialize)]
struct CurrentPrice {
    usd: Option<f64>,
}

/// [`PriceSource`] backed by CoinGecko's `/coins/{platform}/contract/{address}`
pub struct CoinGeckoPrices {
    client: Client,
    base_url: String,
    platform: &'static str,
    api_key: Option<(String, SecretString)>,
    permits: Arc<Semaphore>,
}

impl CoinGeckoPrices {
    /// Create a price source for a network
    ///
    /// The API key, if any, is read from the environment variable named in
    /// the settings.
    pub fn new(settings: &PriceSettings, network: Network) -> Result<Self> {
        let api_key = settings
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());
        Self::with_api_key(settings, network, api_key)
    }

    /// Create a price source with an explicit API key
    pub fn with_api_key(
        settings: &PriceSettings,
        network: Network,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;

        let api_key = api_key
            .filter(|key| !key.is_empty())
            .map(|key| (settings.api_key_header.clone(), SecretString::from(key)));

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            platform: network.price_platform(),
            api_key,
            permits: Arc::new(Semaphore::new(settings.max_concurrent_requests.max(1))),
        })
    }

    fn endpoint(&self, token: Address) -> String {
        format!("{}/coins/{}/contract/{:#x}", self.base_url, self.platform, token)
    }

    async fn fetch(&self, token: Address) -> std::result::Result<Option<f64>, reqwest::Error> {
        let mut request = self.client.get(self.endpoint(token));
        if let Some((header, key)) = &self.api_key {
            request = request.header(header.as_str(), key.expose_secret());
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::debug!(token = %token, "Price source throttled request");
                return Ok(None);
            }
            status => {
                tracing::debug!(token = %token, status = %status, "Price lookup failed");
                return Ok(None);
            }
        }

        let body: ContractResponse = response.json().await?;
        Ok(body
            .market_data
            .and_then(|m| m.current_price)
            .and_then(|p| p.usd))
    }
}

#[async_trait]
impl PriceSource for CoinGeckoPrices {
    async fn usd_price(&self, token: Address) -> Option<f64> {
        let _permit = self.permits.acquire().await.ok()?;

        match self.fetch(token).await {
            Ok(price) => price.filter(|p| p.is_finite() && *p >= 0.0),
            Err(e) => {
                tracing::debug!(token = %token, error = %e, "Price lookup error");
                None
            }
        }
    }
}
