//! Client SDK for fixed-term bond depositories and donation drives.
//!
//! Reads go through [`EvmViewTransport`], state changes through
//! [`EvmTransport`] plus [`EvmReceiptTransport`]; contract addresses and
//! decimal precisions come from an [`AddressRegistry`].

pub mod amount;
pub mod contracts;
pub mod donation;
pub mod error;
pub mod orchestrator;
pub mod position;
pub mod quote;
pub mod registry;
pub mod status;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use amount::{from_fixed_point, to_fixed_point, FixedPoint, Precision};
pub use contracts::{
    BondDepositoryClient, BondTerms, BondingCalculatorClient, DepositArgs, DepositorRecord,
    DonationDriveClient, Erc20Client, PairClient, PairReserves, RedeemArgs, TxHash,
};
pub use donation::{DonationReader, DonationStats};
pub use error::{Error, ErrorCode, Result, RpcFailure};
pub use orchestrator::{
    ApprovalOutcome, BondOutcome, BondRequest, Slippage, TransactionOrchestrator, TxOutcome,
};
pub use position::{PositionReader, UserBondPosition};
pub use quote::{read_market_price, BondQuote, Discount, QuoteEngine, QuoteWarning, PLACEHOLDER_AMOUNT};
pub use registry::{
    AddressRegistry, BondDeployment, BondId, BondKind, DepositoryGeneration, DonationDeployment,
    MarketDeployment, NetworkDeployment, NetworkId,
};
pub use status::{NoopReporter, StatusReporter, StatusTracker, TxStatus};
#[cfg(not(target_arch = "wasm32"))]
pub use transport::AlloyHttpTransport;
pub use transport::{EvmCall, EvmReceiptTransport, EvmTransport, EvmViewTransport, TxReceipt};
