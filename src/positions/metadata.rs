//! Token metadata resolution
//!
//! `decimals()` and `symbol()` are optional in ERC20, so either may be
//! missing. Missing values stay `None`; callers fall back to 18 decimals.

use super::model::TokenInfo;
use crate::chain::abi::{self, IERC20Bytes32Symbol, IERC20Metadata};
use crate::chain::ContractReader;
use alloy::primitives::{Address, FixedBytes};
use alloy::sol_types::SolCall;

/// Resolve symbol and decimals of `token`
pub async fn resolve_token(reader: &dyn ContractReader, token: Address) -> TokenInfo {
    let (decimals, symbol) = tokio::join!(
        abi::read(reader, token, IERC20Metadata::decimalsCall {}),
        resolve_symbol(reader, token),
    );

    let decimals = decimals
        .map_err(|e| {
            tracing::debug!(token = %token, reason = %e, "decimals() unavailable");
        })
        .ok();

    TokenInfo {
        address: token,
        symbol,
        decimals,
    }
}

/// Resolve both legs of a pair concurrently
pub async fn resolve_pair_tokens(
    reader: &dyn ContractReader,
    token0: Address,
    token1: Address,
) -> (TokenInfo, TokenInfo) {
    tokio::join!(resolve_token(reader, token0), resolve_token(reader, token1))
}

async fn resolve_symbol(reader: &dyn ContractReader, token: Address) -> Option<String> {
    let input = IERC20Metadata::symbolCall {};
    let output = match reader.call(token, input.abi_encode().into()).await {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(token = %token, reason = %e, "symbol() unavailable");
            return None;
        }
    };

    let symbol = abi::decode_returns::<IERC20Metadata::symbolCall>(&output).or_else(|_| {
        abi::decode_returns::<IERC20Bytes32Symbol::symbolCall>(&output).map(bytes32_symbol)
    });

    match symbol {
        Ok(symbol) => clean_symbol(&symbol),
        Err(e) => {
            tracing::debug!(token = %token, reason = %e, "symbol() undecodable");
            None
        }
    }
}

fn bytes32_symbol(raw: FixedBytes<32>) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn clean_symbol(symbol: &str) -> Option<String> {
    let trimmed = symbol.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
