pub mod bond_depository;
pub mod bonding_calculator;
pub mod common;
pub mod donation_drive;
pub mod erc20;
pub mod pair;

pub use bond_depository::{
    BondDepositoryClient, BondTerms, DepositArgs, DepositorRecord, RedeemArgs,
};
pub use bonding_calculator::BondingCalculatorClient;
pub use common::TxHash;
pub use donation_drive::DonationDriveClient;
pub use erc20::Erc20Client;
pub use pair::{PairClient, PairReserves};
