//! Contract interfaces read by the position valuator

use super::{ContractReader, Unavailable};
use alloy::primitives::{Address, Bytes};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function totalSupply() external view returns (uint256);
    }

    interface IERC20Metadata {
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }

    // Pre-standard tokens (MKR, SAI) return their symbol as bytes32
    interface IERC20Bytes32Symbol {
        function symbol() external view returns (bytes32);
    }
}

/// Issue one typed read-only call and decode its return data.
pub async fn read<C: SolCall>(
    reader: &dyn ContractReader,
    to: Address,
    call: C,
) -> Result<C::Return, Unavailable> {
    let output = reader.call(to, Bytes::from(call.abi_encode())).await?;
    decode_returns::<C>(&output)
}

/// Decode a call's return data; empty output (no code at the address) is
/// reported separately from malformed output.
pub fn decode_returns<C: SolCall>(output: &[u8]) -> Result<C::Return, Unavailable> {
    if output.is_empty() {
        return Err(Unavailable::EmptyReturn);
    }
    C::abi_decode_returns(output).map_err(|e| Unavailable::Decode(e.to_string()))
}
