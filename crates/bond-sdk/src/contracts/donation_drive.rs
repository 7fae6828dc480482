use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use crate::{
    contracts::common::{call_view, send_call, TxHash},
    error::Result,
    transport::{EvmTransport, EvmViewTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract DonationDrive {
        function deposit(uint256 amount);
        function balance() view returns (uint256);
        function targetAmount() view returns (uint256);
    }
}

/// Client bound to a donation drive contract.
#[derive(Clone)]
pub struct DonationDriveClient<T> {
    drive: Address,
    transport: T,
}

impl<T> DonationDriveClient<T> {
    pub fn new(drive: Address, transport: T) -> Self {
        Self { drive, transport }
    }

    pub fn address(&self) -> Address {
        self.drive
    }
}

impl<T: EvmViewTransport> DonationDriveClient<T> {
    /// Total donated so far.
    pub fn total_donated(&self) -> Result<U256> {
        call_view(&self.transport, self.drive, DonationDrive::balanceCall {})
            .map(|decoded| decoded._0)
    }

    pub fn target_amount(&self) -> Result<U256> {
        call_view(&self.transport, self.drive, DonationDrive::targetAmountCall {})
            .map(|decoded| decoded._0)
    }
}

impl<T: EvmTransport> DonationDriveClient<T> {
    pub fn deposit(&self, amount: U256, gas_limit: Option<u64>) -> Result<TxHash> {
        send_call(
            &self.transport,
            self.drive,
            DonationDrive::depositCall { amount },
            gas_limit.unwrap_or(250_000),
        )
    }
}
