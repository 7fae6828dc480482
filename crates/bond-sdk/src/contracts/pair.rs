use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use crate::{contracts::common::call_view, error::Result, transport::EvmViewTransport};

sol! {
    #[allow(non_camel_case_types)]
    contract LiquidityPair {
        function getReserves() view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
    }
}

/// Pair reserves widened to 256 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairReserves {
    pub reserve0: U256,
    pub reserve1: U256,
    pub block_timestamp_last: u32,
}

impl From<LiquidityPair::getReservesReturn> for PairReserves {
    fn from(value: LiquidityPair::getReservesReturn) -> Self {
        Self {
            reserve0: U256::from_be_slice(&value.reserve0.to_be_bytes::<14>()),
            reserve1: U256::from_be_slice(&value.reserve1.to_be_bytes::<14>()),
            block_timestamp_last: value.blockTimestampLast,
        }
    }
}

/// View-only client for a Uniswap-v2 style pair.
#[derive(Clone)]
pub struct PairClient<T: EvmViewTransport> {
    pair: Address,
    transport: T,
}

impl<T: EvmViewTransport> PairClient<T> {
    pub fn new(pair: Address, transport: T) -> Self {
        Self { pair, transport }
    }

    pub fn address(&self) -> Address {
        self.pair
    }

    pub fn reserves(&self) -> Result<PairReserves> {
        call_view(&self.transport, self.pair, LiquidityPair::getReservesCall {}).map(Into::into)
    }
}
