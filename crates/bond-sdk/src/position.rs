//! Per-user bond state: outstanding payout, vesting and reserve approvals.

use core::cmp::Ordering;

use alloy_primitives::Address;
use log::debug;

use crate::{
    amount::{FixedPoint, Precision},
    contracts::{common::block_number, BondDepositoryClient, DepositorRecord, Erc20Client},
    error::{Error, Result},
    registry::{AddressRegistry, BondDeployment, BondId, NetworkId},
    transport::EvmViewTransport,
};

/// Snapshot of one address's standing in one bond.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserBondPosition {
    pub bond: BondId,
    /// Protocol tokens still owed, vested or not.
    pub interest_due: FixedPoint,
    /// Vested protocol tokens that `redeem` would release now.
    pub pending_payout: FixedPoint,
    /// Block at which the whole payout is vested.
    pub maturation_block: u64,
    /// Reserve-token allowance granted to the depository.
    pub allowance: FixedPoint,
    /// Reserve-token balance of the address.
    pub balance: FixedPoint,
}

impl UserBondPosition {
    /// True when the current allowance already covers `amount`.
    pub fn has_approval(&self, amount: &FixedPoint) -> bool {
        self.allowance.cmp_scaled(amount) != Ordering::Less
    }
}

/// Reads bond positions against one address registry.
pub struct PositionReader<'r, T> {
    registry: &'r AddressRegistry,
    transport: T,
}

impl<'r, T: EvmViewTransport> PositionReader<'r, T> {
    pub fn new(registry: &'r AddressRegistry, transport: T) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Reads `address`'s position in `bond` on `network`.
    ///
    /// An address that never bonded gets a zeroed record instead of an
    /// error. Every other failed read surfaces as
    /// [`Error::PositionUnavailable`].
    pub fn read_user_position(
        &self,
        address: Address,
        bond: BondId,
        network: NetworkId,
    ) -> Result<UserBondPosition> {
        let deployment = self.registry.bond(network, bond)?;
        self.read(deployment, address)
            .map_err(Error::position_unavailable)
    }

    fn read(&self, deployment: &BondDeployment, address: Address) -> Result<UserBondPosition> {
        let depository = BondDepositoryClient::new(
            deployment.depository,
            deployment.kind.generation(),
            &self.transport,
        );
        let reserve = Erc20Client::new(deployment.reserve, &self.transport);

        let record = depository.depositor_record(address).unwrap_or_else(|err| {
            debug!("{}: no depositor record for {address}: {err}", deployment.id);
            DepositorRecord::default()
        });
        let pending = depository.pending_payout(address)?;
        let allowance = reserve.allowance(address, deployment.depository)?;
        let balance = reserve.balance_of(address)?;

        // Depositor records count protocol tokens whatever the reserve is.
        Ok(UserBondPosition {
            bond: deployment.id,
            interest_due: FixedPoint::new(record.payout_due, Precision::PROTOCOL_TOKEN),
            pending_payout: FixedPoint::new(pending, Precision::PROTOCOL_TOKEN),
            maturation_block: block_number(record.maturation_block(), "maturation block")?,
            allowance: FixedPoint::new(allowance, deployment.reserve_precision),
            balance: FixedPoint::new(balance, deployment.reserve_precision),
        })
    }
}
