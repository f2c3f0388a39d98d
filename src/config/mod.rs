//! Configuration for the LP portfolio service

pub mod rpc;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Environment variable overriding the HTTP server port
pub const PORT_ENV: &str = "PORT";

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Ethereum,
    Arbitrum,
    Optimism,
    Base,
    Polygon,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Arbitrum => 42161,
            Network::Optimism => 10,
            Network::Base => 8453,
            Network::Polygon => 137,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
            Network::Base => "base",
            Network::Polygon => "polygon",
        }
    }

    /// CoinGecko asset platform id used by the contract price endpoint
    pub fn price_platform(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Arbitrum => "arbitrum-one",
            Network::Optimism => "optimistic-ethereum",
            Network::Base => "base",
            Network::Polygon => "polygon-pos",
        }
    }
}

/// Chain read settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    /// Timeout for a single eth_call (milliseconds)
    pub call_timeout_ms: u64,
    /// Maximum number of eth_calls in flight at once
    pub max_concurrent_calls: usize,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 10_000,
            max_concurrent_calls: 32,
        }
    }
}

/// Price source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceSettings {
    /// Base URL of the CoinGecko-compatible API
    pub base_url: String,
    /// Timeout for a single price lookup (milliseconds)
    pub timeout_ms: u64,
    /// Maximum number of price lookups in flight at once
    pub max_concurrent_requests: usize,
    /// Environment variable holding an API key, if any
    pub api_key_env: Option<String>,
    /// Header the API key is sent in
    pub api_key_header: String,
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            timeout_ms: 5_000,
            max_concurrent_requests: 8,
            api_key_env: Some("COINGECKO_API_KEY".to_string()),
            api_key_header: "x-cg-demo-api-key".to_string(),
        }
    }
}

/// Balance indexer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSettings {
    /// Balances requested per page
    pub page_size: u32,
    /// Upper bound on pages followed for one wallet
    pub max_pages: u32,
    /// Timeout for a single page request (milliseconds)
    pub timeout_ms: u64,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 5,
            timeout_ms: 15_000,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network whose wallets are valued
    pub network: Network,
    /// Maximum number of non-zero balances probed per wallet
    pub candidate_limit: usize,
    /// Deadline for a whole positions request (milliseconds)
    pub request_timeout_ms: u64,
    pub rpc: RpcSettings,
    pub price: PriceSettings,
    pub indexer: IndexerSettings,
    pub server: ServerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Ethereum,
            candidate_limit: 80,
            request_timeout_ms: 30_000,
            rpc: RpcSettings::default(),
            price: PriceSettings::default(),
            indexer: IndexerSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, or the defaults when no path is given
    ///
    /// The `PORT` environment variable, when set, overrides the server port.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_port(path, std::env::var(PORT_ENV).ok().as_deref())
    }

    /// [`Config::load`] with the port override passed in
    pub fn load_with_port(path: Option<&Path>, port: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?
            }
            None => Config::default(),
        };

        if let Some(port) = port {
            let port: u16 = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {}: {}", PORT_ENV, e)))?;
            config.server.bind_addr.set_port(port);
        }

        if config.candidate_limit == 0 {
            return Err(Error::Config("candidate_limit must be at least 1".to_string()));
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_config_fills_defaults() {
        let value = serde_json::json!({
            "network": "arbitrum",
            "candidate_limit": 20,
            "price": { "timeout_ms": 1000 }
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.network, Network::Arbitrum);
        assert_eq!(parsed.candidate_limit, 20);
        assert_eq!(parsed.price.timeout_ms, 1000);
        assert_eq!(parsed.price.base_url, "https://api.coingecko.com/api/v3");
        assert_eq!(parsed.rpc.max_concurrent_calls, 32);
        assert_eq!(parsed.indexer.page_size, 100);
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "network": "base", "request_timeout_ms": 5000, "server": {{ "bind_addr": "0.0.0.0:8080" }} }}"#
        )
        .unwrap();

        let config = Config::load_with_port(Some(file.path()), None).unwrap();
        assert_eq!(config.network, Network::Base);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.candidate_limit, 80);
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn port_override_replaces_bind_port() {
        let config = Config::load_with_port(None, Some("9000")).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");

        assert!(matches!(
            Config::load_with_port(None, Some("http")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn load_rejects_zero_candidate_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "candidate_limit": 0 }}"#).unwrap();
        assert!(matches!(
            Config::load_with_port(Some(file.path()), None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            Config::load_with_port(Some(file.path()), None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn price_platforms() {
        assert_eq!(Network::Ethereum.price_platform(), "ethereum");
        assert_eq!(Network::Arbitrum.price_platform(), "arbitrum-one");
        assert_eq!(Network::Polygon.chain_id(), 137);
    }
}
