//! Donation drive progress and the donor's token standing.

use alloy_primitives::Address;

use crate::{
    amount::FixedPoint,
    contracts::{DonationDriveClient, Erc20Client},
    error::{Error, Result},
    registry::{AddressRegistry, DonationDeployment, NetworkId},
    transport::EvmViewTransport,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonationStats {
    /// Donor's balance of the donation token.
    pub balance: FixedPoint,
    pub total_donated: FixedPoint,
    pub goal: FixedPoint,
}

impl DonationStats {
    /// True once the drive has collected at least its goal.
    pub fn goal_reached(&self) -> bool {
        !self.goal.is_zero() && self.total_donated.cmp_scaled(&self.goal).is_ge()
    }
}

pub struct DonationReader<'r, T> {
    registry: &'r AddressRegistry,
    transport: T,
}

impl<'r, T: EvmViewTransport> DonationReader<'r, T> {
    pub fn new(registry: &'r AddressRegistry, transport: T) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn donation_stats(&self, owner: Address, network: NetworkId) -> Result<DonationStats> {
        let donation = self.registry.donation(network)?;
        self.read_stats(donation, owner)
            .map_err(Error::position_unavailable)
    }

    /// Donation-token allowance `owner` granted to the drive.
    pub fn donation_allowance(&self, owner: Address, network: NetworkId) -> Result<FixedPoint> {
        let donation = self.registry.donation(network)?;
        Erc20Client::new(donation.token, &self.transport)
            .allowance(owner, donation.contract)
            .map(|raw| FixedPoint::new(raw, donation.token_precision))
            .map_err(Error::position_unavailable)
    }

    fn read_stats(&self, donation: &DonationDeployment, owner: Address) -> Result<DonationStats> {
        let drive = DonationDriveClient::new(donation.contract, &self.transport);
        let token = Erc20Client::new(donation.token, &self.transport);
        let precision = donation.token_precision;
        Ok(DonationStats {
            balance: FixedPoint::new(token.balance_of(owner)?, precision),
            total_donated: FixedPoint::new(drive.total_donated()?, precision),
            goal: FixedPoint::new(drive.target_amount()?, precision),
        })
    }
}
