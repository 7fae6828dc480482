use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use crate::{
    contracts::common::{call_view, send_call, TxHash},
    error::Result,
    transport::{EvmTransport, EvmViewTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract Erc20 {
        function approve(address spender, uint256 amount) returns (bool);
        function allowance(address owner, address spender) view returns (uint256);
        function balanceOf(address account) view returns (uint256);
    }
}

/// Client bound to a reserve or donation token.
#[derive(Clone)]
pub struct Erc20Client<T> {
    token: Address,
    transport: T,
}

impl<T> Erc20Client<T> {
    pub fn new(token: Address, transport: T) -> Self {
        Self { token, transport }
    }

    pub fn address(&self) -> Address {
        self.token
    }
}

impl<T: EvmViewTransport> Erc20Client<T> {
    pub fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        call_view(
            &self.transport,
            self.token,
            Erc20::allowanceCall { owner, spender },
        )
        .map(|decoded| decoded._0)
    }

    pub fn balance_of(&self, account: Address) -> Result<U256> {
        call_view(&self.transport, self.token, Erc20::balanceOfCall { account })
            .map(|decoded| decoded._0)
    }
}

impl<T: EvmTransport> Erc20Client<T> {
    pub fn approve(&self, spender: Address, amount: U256, gas_limit: Option<u64>) -> Result<TxHash> {
        send_call(
            &self.transport,
            self.token,
            Erc20::approveCall { spender, amount },
            gas_limit.unwrap_or(100_000),
        )
    }
}
