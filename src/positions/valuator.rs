//! Single-candidate valuation
//!
//! Turns one wallet balance into a [`Position`], or `None` when the token is
//! not a pair. Errors are local to the candidate; the aggregator drops them.

use super::metadata::resolve_pair_tokens;
use super::model::{PairMetadata, Position, TokenInfo, ValuedLeg};
use super::prober::probe_pair;
use crate::chain::ContractReader;
use crate::indexer::RawBalance;
use crate::math::{self, ArithmeticError};
use crate::price::PriceSource;
use alloy::primitives::{Address, U256};
use std::sync::Arc;

/// Why a pair could not be valued
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValuationError {
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("USD value of {token} is not finite")]
    NonFiniteValue { token: Address },
}

/// Values candidates against injected chain and price collaborators
#[derive(Clone)]
pub struct PositionValuator {
    reader: Arc<dyn ContractReader>,
    prices: Arc<dyn PriceSource>,
}

impl PositionValuator {
    pub fn new(reader: Arc<dyn ContractReader>, prices: Arc<dyn PriceSource>) -> Self {
        Self { reader, prices }
    }

    /// Value one balance; `Ok(None)` for zero balances and non-pairs
    pub async fn value(&self, balance: &RawBalance) -> Result<Option<Position>, ValuationError> {
        let Some(lp_balance) = balance.amount().filter(|amount| !amount.is_zero()) else {
            return Ok(None);
        };

        let Some(pair) = probe_pair(self.reader.as_ref(), balance.contract_address).await else {
            return Ok(None);
        };

        self.value_pair(pair, lp_balance).await.map(Some)
    }

    /// Value a holding of `lp_balance` in an already probed pair
    pub async fn value_pair(
        &self,
        pair: PairMetadata,
        lp_balance: U256,
    ) -> Result<Position, ValuationError> {
        let (info0, info1) = resolve_pair_tokens(self.reader.as_ref(), pair.token0, pair.token1).await;

        let share = math::pool_share(lp_balance, pair.total_supply)?;
        let amount0 = math::reserve_portion(pair.reserve0, share)?;
        let amount1 = math::reserve_portion(pair.reserve1, share)?;

        let (price0, price1) = tokio::join!(
            self.prices.usd_price(pair.token0),
            self.prices.usd_price(pair.token1),
        );

        let token0 = value_leg(info0, amount0, price0)?;
        let token1 = value_leg(info1, amount1, price1)?;

        Ok(Position::new(
            pair.pair_address,
            token0,
            token1,
            pair.total_supply,
            lp_balance,
        ))
    }
}

fn value_leg(
    info: TokenInfo,
    user_amount: U256,
    price_usd: Option<f64>,
) -> Result<ValuedLeg, ValuationError> {
    let decimals = info.effective_decimals();
    let usd_value = match price_usd {
        Some(price) => {
            let value = math::to_decimal(user_amount, decimals) * price;
            if !value.is_finite() {
                return Err(ValuationError::NonFiniteValue {
                    token: info.address,
                });
            }
            Some(value)
        }
        None => None,
    };

    Ok(ValuedLeg {
        address: info.address,
        symbol: info.symbol,
        decimals: info.decimals,
        user_amount,
        price_usd,
        usd_value,
    })
}
