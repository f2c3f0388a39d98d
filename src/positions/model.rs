//! Position data model

use alloy::primitives::{Address, U256};
use serde::{Serialize, Serializer};

/// Decimals assumed for tokens that do not report their own
pub const DEFAULT_DECIMALS: u8 = 18;

/// Serialize a `U256` as a base-10 string
fn decimal_string<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// ERC20 metadata resolved for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

impl TokenInfo {
    /// Token with no resolved metadata
    pub fn unresolved(address: Address) -> Self {
        Self {
            address,
            symbol: None,
            decimals: None,
        }
    }

    /// Reported decimals, or [`DEFAULT_DECIMALS`]
    pub fn effective_decimals(&self) -> u8 {
        self.decimals.unwrap_or(DEFAULT_DECIMALS)
    }
}

/// Structural data of a constant-product pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairMetadata {
    pub pair_address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub total_supply: U256,
}

impl PairMetadata {
    /// A pair with no LP supply holds no claimable liquidity
    pub fn has_liquidity(&self) -> bool {
        !self.total_supply.is_zero()
    }
}

/// One side of a position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuedLeg {
    pub address: Address,
    pub symbol: Option<String>,
    /// Reported decimals; amounts of tokens without one are read at 18
    pub decimals: Option<u8>,
    #[serde(serialize_with = "decimal_string")]
    pub user_amount: U256,
    #[serde(rename = "priceUSD")]
    pub price_usd: Option<f64>,
    pub usd_value: Option<f64>,
}

/// How much of a position's USD value is backed by prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Valuation {
    /// Both legs priced
    Complete,
    /// Exactly one leg priced; `usdValue` covers that leg only
    Partial,
    /// No leg priced; `usdValue` is 0 and says nothing about worth
    Unknown,
}

impl Valuation {
    pub fn from_legs(token0: &ValuedLeg, token1: &ValuedLeg) -> Self {
        match (token0.usd_value.is_some(), token1.usd_value.is_some()) {
            (true, true) => Valuation::Complete,
            (false, false) => Valuation::Unknown,
            _ => Valuation::Partial,
        }
    }
}

/// Protocol tag carried by every position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PoolKind {
    #[serde(rename = "uniswap_v2")]
    UniswapV2,
}

/// A valued LP position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(rename = "type")]
    pub kind: PoolKind,
    pub pair_address: Address,
    pub token0: ValuedLeg,
    pub token1: ValuedLeg,
    #[serde(serialize_with = "decimal_string")]
    pub total_supply: U256,
    #[serde(serialize_with = "decimal_string")]
    pub lp_balance: U256,
    /// Sum of the priced legs
    pub usd_value: f64,
    pub valuation: Valuation,
}

impl Position {
    pub fn new(
        pair_address: Address,
        token0: ValuedLeg,
        token1: ValuedLeg,
        total_supply: U256,
        lp_balance: U256,
    ) -> Self {
        let usd_value = token0.usd_value.unwrap_or(0.0) + token1.usd_value.unwrap_or(0.0);
        let valuation = Valuation::from_legs(&token0, &token1);
        Self {
            kind: PoolKind::UniswapV2,
            pair_address,
            token0,
            token1,
            total_supply,
            lp_balance,
            usd_value,
            valuation,
        }
    }
}
