//! RPC endpoint configuration
//!
//! Supports multiple configuration methods following Ethereum ecosystem conventions:
//! 1. Per-chain env vars (ETH_RPC_URL, ARBITRUM_RPC_URL, etc.) - highest priority
//! 2. ALCHEMY_API_KEY - builds URLs automatically
//! 3. Public RPC fallbacks - for testing only
//!
//! Wallet balance listing uses `alchemy_getTokenBalances`, so it is only
//! available when the endpoint for a chain is served by Alchemy.
//!
//! # Examples
//!
//! ```bash
//! # Option 1: Per-chain URLs
//! export ETH_RPC_URL="https://eth-mainnet.g.alchemy.com/v2/YOUR_KEY"
//!
//! # Option 2: Single provider API key
//! export ALCHEMY_API_KEY="YOUR_KEY"
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const ARBITRUM: u64 = 42161;
    pub const OPTIMISM: u64 = 10;
    pub const BASE: u64 = 8453;
    pub const POLYGON: u64 = 137;

    pub const ALL: [u64; 5] = [ETHEREUM, ARBITRUM, OPTIMISM, BASE, POLYGON];
}

/// Environment variable names
pub(crate) mod env_vars {
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const ARBITRUM_RPC_URL: &str = "ARBITRUM_RPC_URL";
    pub const OPTIMISM_RPC_URL: &str = "OPTIMISM_RPC_URL";
    pub const BASE_RPC_URL: &str = "BASE_RPC_URL";
    pub const POLYGON_RPC_URL: &str = "POLYGON_RPC_URL";

    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const ARBITRUM: &str = "https://arb1.arbitrum.io/rpc";
    pub const OPTIMISM: &str = "https://mainnet.optimism.io";
    pub const BASE: &str = "https://mainnet.base.org";
    pub const POLYGON: &str = "https://polygon-rpc.com";
}

fn per_chain_var(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        chains::ETHEREUM => Some(env_vars::ETH_RPC_URL),
        chains::ARBITRUM => Some(env_vars::ARBITRUM_RPC_URL),
        chains::OPTIMISM => Some(env_vars::OPTIMISM_RPC_URL),
        chains::BASE => Some(env_vars::BASE_RPC_URL),
        chains::POLYGON => Some(env_vars::POLYGON_RPC_URL),
        _ => None,
    }
}

fn public_rpc(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        chains::ETHEREUM => Some(public_rpcs::ETHEREUM),
        chains::ARBITRUM => Some(public_rpcs::ARBITRUM),
        chains::OPTIMISM => Some(public_rpcs::OPTIMISM),
        chains::BASE => Some(public_rpcs::BASE),
        chains::POLYGON => Some(public_rpcs::POLYGON),
        _ => None,
    }
}

fn alchemy_subdomain(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        chains::ETHEREUM => Some("eth-mainnet"),
        chains::ARBITRUM => Some("arb-mainnet"),
        chains::OPTIMISM => Some("opt-mainnet"),
        chains::BASE => Some("base-mainnet"),
        chains::POLYGON => Some("polygon-mainnet"),
        _ => None,
    }
}

/// Build the Alchemy endpoint URL for a chain
pub fn alchemy_url(chain_id: u64, api_key: &str) -> Option<String> {
    alchemy_subdomain(chain_id).map(|sub| format!("https://{}.g.alchemy.com/v2/{}", sub, api_key))
}

/// RPC configuration for multiple chains
///
/// URLs usually embed an API key, so they are kept as secrets and never logged.
#[derive(Debug)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, SecretString>,
    /// Alchemy key, used for balance indexing whatever serves eth_call
    alchemy_key: Option<SecretString>,
}

impl RpcConfig {
    /// Create RPC config from environment variables
    ///
    /// Priority per chain:
    /// 1. Per-chain env var (ETH_RPC_URL, ARBITRUM_RPC_URL, etc.)
    /// 2. ALCHEMY_API_KEY
    /// 3. Public RPC fallback (for testing only)
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same layering as [`RpcConfig::from_env`] over an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let alchemy_key = lookup(env_vars::ALCHEMY_API_KEY).filter(|k| !k.is_empty());
        let mut urls = HashMap::new();

        for chain_id in chains::ALL {
            if let Some(url) = per_chain_var(chain_id).and_then(|var| lookup(var)) {
                tracing::debug!(chain_id, "Using per-chain RPC URL");
                urls.insert(chain_id, SecretString::from(url));
                continue;
            }

            if let Some(url) = alchemy_key
                .as_deref()
                .and_then(|key| alchemy_url(chain_id, key))
            {
                tracing::debug!(chain_id, "Building RPC URL from ALCHEMY_API_KEY");
                urls.insert(chain_id, SecretString::from(url));
                continue;
            }

            if chain_id == chains::ETHEREUM {
                tracing::warn!("No RPC configured for Ethereum, using public RPC (rate limited)");
            }
            if let Some(url) = public_rpc(chain_id) {
                urls.insert(chain_id, SecretString::from(url.to_string()));
            }
        }

        Self {
            urls,
            alchemy_key: alchemy_key.map(SecretString::from),
        }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self {
            urls: urls
                .into_iter()
                .map(|(chain_id, url)| (chain_id, SecretString::from(url)))
                .collect(),
            alchemy_key: None,
        }
    }

    /// Set the Alchemy key used for balance indexing
    pub fn with_alchemy_key(mut self, key: impl Into<String>) -> Self {
        self.alchemy_key = Some(SecretString::from(key.into()));
        self
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.expose_secret())
    }

    /// Get the URL able to serve `alchemy_getTokenBalances` for a chain
    ///
    /// The chain's RPC URL when Alchemy serves it, otherwise one built from
    /// the Alchemy key.
    pub fn indexer_url(&self, chain_id: u64) -> Option<String> {
        self.get(chain_id)
            .filter(|url| url.contains(".alchemy.com/"))
            .map(str::to_string)
            .or_else(|| {
                self.alchemy_key
                    .as_ref()
                    .and_then(|key| alchemy_url(chain_id, key.expose_secret()))
            })
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
