//! Pair classification
//!
//! A held token is treated as a constant-product pair only if `token0()`,
//! `token1()`, `getReserves()` and `totalSupply()` all answer. The four reads
//! are independent and run concurrently.

use super::model::PairMetadata;
use crate::chain::abi::{self, IUniswapV2Pair};
use crate::chain::{ContractReader, Unavailable};
use alloy::primitives::{Address, U256};

/// Per-field probe results before classification
#[derive(Debug)]
pub struct PairProbe {
    pub token0: Result<Address, Unavailable>,
    pub token1: Result<Address, Unavailable>,
    pub reserves: Result<(U256, U256), Unavailable>,
    pub total_supply: Result<U256, Unavailable>,
}

impl PairProbe {
    /// Pair metadata if every field resolved
    pub fn into_metadata(self, pair_address: Address) -> Option<PairMetadata> {
        let (reserve0, reserve1) = self.reserves.ok()?;
        Some(PairMetadata {
            pair_address,
            token0: self.token0.ok()?,
            token1: self.token1.ok()?,
            reserve0,
            reserve1,
            total_supply: self.total_supply.ok()?,
        })
    }

    fn first_failure(&self) -> Option<(&'static str, &Unavailable)> {
        [
            ("token0", self.token0.as_ref().err()),
            ("token1", self.token1.as_ref().err()),
            ("getReserves", self.reserves.as_ref().err()),
            ("totalSupply", self.total_supply.as_ref().err()),
        ]
        .into_iter()
        .find_map(|(field, err)| err.map(|e| (field, e)))
    }
}

/// Issue the four pair reads against `address`
pub async fn probe(reader: &dyn ContractReader, address: Address) -> PairProbe {
    let (token0, token1, reserves, total_supply) = tokio::join!(
        abi::read(reader, address, IUniswapV2Pair::token0Call {}),
        abi::read(reader, address, IUniswapV2Pair::token1Call {}),
        abi::read(reader, address, IUniswapV2Pair::getReservesCall {}),
        abi::read(reader, address, IUniswapV2Pair::totalSupplyCall {}),
    );

    PairProbe {
        token0,
        token1,
        reserves: reserves.map(|r| {
            (
                U256::from(r.reserve0.to::<u128>()),
                U256::from(r.reserve1.to::<u128>()),
            )
        }),
        total_supply,
    }
}

/// Classify `address`; `None` means "not a pool"
pub async fn probe_pair(reader: &dyn ContractReader, address: Address) -> Option<PairMetadata> {
    let probe = probe(reader, address).await;
    if let Some((field, reason)) = probe.first_failure() {
        tracing::debug!(
            address = %address,
            field,
            reason = %reason,
            "Not a pair"
        );
        return None;
    }
    probe.into_metadata(address)
}
