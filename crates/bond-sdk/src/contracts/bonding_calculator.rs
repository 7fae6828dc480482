use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use crate::{contracts::common::call_view, error::Result, transport::EvmViewTransport};

sol! {
    #[allow(non_camel_case_types)]
    contract BondingCalculator {
        function valuation(address pair, uint256 amount) view returns (uint256 value_);
    }
}

/// View-only client for the risk-free-value calculator used by LP bonds.
#[derive(Clone)]
pub struct BondingCalculatorClient<T: EvmViewTransport> {
    calculator: Address,
    transport: T,
}

impl<T: EvmViewTransport> BondingCalculatorClient<T> {
    pub fn new(calculator: Address, transport: T) -> Self {
        Self {
            calculator,
            transport,
        }
    }

    pub fn address(&self) -> Address {
        self.calculator
    }

    /// Values `amount` LP tokens of `pair`, assuming 1:1 backing of the reserve side.
    pub fn valuation(&self, pair: Address, amount: U256) -> Result<U256> {
        call_view(
            &self.transport,
            self.calculator,
            BondingCalculator::valuationCall { pair, amount },
        )
        .map(|decoded| decoded.value_)
    }
}
