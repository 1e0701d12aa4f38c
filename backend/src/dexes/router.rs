use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use tracing::debug;

use crate::errors::EndpointError;
use crate::rpc::ChainClient;

sol! {
    interface IUniswapV2Router {
        function getAmountsOut(
            uint amountIn,
            address[] calldata path
        ) external view returns (uint[] memory amounts);
    }
}

/// `getAmountsOut` on a V2-style router; returns the final output amount.
pub async fn query_amounts_out(
    client: &dyn ChainClient,
    router: Address,
    amount_in: U256,
    path: &[Address],
) -> Result<U256, EndpointError> {
    let calldata = IUniswapV2Router::getAmountsOutCall {
        amountIn: amount_in,
        path: path.to_vec(),
    }
    .abi_encode();

    let data = client.call(router, Bytes::from(calldata)).await?;
    let amounts = IUniswapV2Router::getAmountsOutCall::abi_decode_returns(&data, true)
        .map_err(|e| EndpointError::InvalidResponse(format!("getAmountsOut decode: {}", e)))?
        .amounts;

    debug!("getAmountsOut via {:?}: {:?}", router, amounts);

    // The router answers with one amount per path element
    if amounts.len() != path.len() {
        return Err(EndpointError::InvalidResponse(format!(
            "expected {} amounts, got {}",
            path.len(),
            amounts.len()
        )));
    }
    amounts
        .last()
        .copied()
        .ok_or_else(|| EndpointError::InvalidResponse("empty amounts array".into()))
}
