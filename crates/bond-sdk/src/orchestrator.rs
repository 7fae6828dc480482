//! Drives approve, bond, redeem and donate transactions through their status lifecycle.
//!
//! Every operation follows the same sequence: pre-flight reads and argument
//! checks (no status emitted), `userConfirmation` right before the signed
//! send, `networkConfirmation` once the node accepted the transaction, then
//! `done` after a successful receipt. Failures after `userConfirmation` emit
//! exactly one `error` and are returned to the caller as well.

use alloy_primitives::{Address, U256};
use log::{info, warn};

use crate::{
    amount::{to_fixed_point, FixedPoint, Precision},
    contracts::{
        BondDepositoryClient, DepositArgs, DonationDriveClient, Erc20Client, RedeemArgs, TxHash,
    },
    error::{Error, Result},
    registry::{AddressRegistry, BondId, NetworkId},
    status::{StatusReporter, TxStatus, USER_REJECTED},
    transport::{EvmReceiptTransport, EvmTransport, EvmViewTransport, TxReceipt},
};

/// Reserve tokens approved by [`TransactionOrchestrator::approve_bond`].
pub const UNLIMITED_APPROVAL: &str = "1000000000";
/// Confirmations required before an operation reports `done`.
pub const REQUIRED_CONFIRMATIONS: u64 = 1;

pub const APPROVED_MESSAGE: &str = "Transaction approved successfully";
pub const CONFIRMED_MESSAGE: &str = "Transaction confirmed";

const SUB_UNDERFLOW: &str = "ds-math-sub-underflow";
const BPS_DENOMINATOR: u64 = 10_000;

/// Price tolerance applied to the bond price when bounding a deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slippage {
    bps: u32,
}

impl Slippage {
    pub const fn from_bps(bps: u32) -> Self {
        Self { bps }
    }

    pub fn bps(self) -> u32 {
        self.bps
    }

    /// `round(price * (1 + slippage))`, half rounding up.
    pub fn max_price(self, price: U256) -> U256 {
        let numerator = price.saturating_mul(U256::from(BPS_DENOMINATOR + u64::from(self.bps)));
        numerator.saturating_add(U256::from(BPS_DENOMINATOR / 2)) / U256::from(BPS_DENOMINATOR)
    }
}

impl Default for Slippage {
    /// 2%.
    fn default() -> Self {
        Self::from_bps(200)
    }
}

/// Parameters of a bond deposit.
#[derive(Clone, Debug)]
pub struct BondRequest {
    pub bond: BondId,
    /// Reserve-token amount as a decimal string.
    pub amount: String,
    pub depositor: Address,
    /// Defaults to [`Slippage::default`].
    pub slippage: Option<Slippage>,
}

/// A mined, successful transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub receipt: TxReceipt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub tx: TxOutcome,
    /// Allowance the spender now holds.
    pub allowance: FixedPoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BondOutcome {
    pub tx: TxOutcome,
    pub max_price: U256,
    /// Depositor's reserve balance re-read after confirmation; `None` if that read failed.
    pub balance: Option<FixedPoint>,
}

/// Submits state-changing calls and reports their progress.
///
/// Holds no lock: callers serialize operations that touch the same position.
pub struct TransactionOrchestrator<'r, T> {
    registry: &'r AddressRegistry,
    transport: T,
    confirmations: u64,
}

impl<'r, T> TransactionOrchestrator<'r, T>
where
    T: EvmTransport + EvmViewTransport + EvmReceiptTransport,
{
    pub fn new(registry: &'r AddressRegistry, transport: T) -> Self {
        Self {
            registry,
            transport,
            confirmations: REQUIRED_CONFIRMATIONS,
        }
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    /// Approves the bond's depository for [`UNLIMITED_APPROVAL`] reserve tokens.
    pub fn approve_bond<R>(&self, bond: BondId, network: NetworkId, reporter: &R) -> Result<ApprovalOutcome>
    where
        R: StatusReporter + ?Sized,
    {
        let deployment = self.registry.bond(network, bond)?;
        let amount = to_fixed_point(UNLIMITED_APPROVAL, deployment.reserve_precision)?;
        let token = Erc20Client::new(deployment.reserve, &self.transport);

        let tx = self.submit(reporter, APPROVED_MESSAGE, || {
            token.approve(deployment.depository, amount, None)
        })?;
        info!("{bond}: approved {} for {UNLIMITED_APPROVAL}", deployment.depository);
        Ok(ApprovalOutcome {
            tx,
            allowance: FixedPoint::new(amount, deployment.reserve_precision),
        })
    }

    /// Approves the donation drive for exactly `amount` donation tokens.
    pub fn approve_donation<R>(&self, amount: &str, network: NetworkId, reporter: &R) -> Result<ApprovalOutcome>
    where
        R: StatusReporter + ?Sized,
    {
        let donation = self.registry.donation(network)?;
        let allowance = FixedPoint::parse(amount, donation.token_precision)?;
        let token = Erc20Client::new(donation.token, &self.transport);

        let tx = self.submit(reporter, APPROVED_MESSAGE, || {
            token.approve(donation.contract, allowance.raw(), None)
        })?;
        Ok(ApprovalOutcome { tx, allowance })
    }

    /// Deposits reserve tokens into a bond, bounded by the current bond price
    /// plus slippage.
    pub fn bond<R>(&self, request: &BondRequest, network: NetworkId, reporter: &R) -> Result<BondOutcome>
    where
        R: StatusReporter + ?Sized,
    {
        let deployment = self.registry.bond(network, request.bond)?;
        let amount = positive_amount(&request.amount, deployment.reserve_precision)?;
        let depository = BondDepositoryClient::new(
            deployment.depository,
            deployment.kind.generation(),
            &self.transport,
        );
        let price = depository.bond_price().map_err(Error::quote_unavailable)?;
        let max_price = request.slippage.unwrap_or_default().max_price(price);
        info!(
            "{}: depositing {amount} for {} (bond price {price}, max {max_price})",
            request.bond, request.depositor
        );

        let tx = self.submit(reporter, CONFIRMED_MESSAGE, || {
            depository.deposit(DepositArgs {
                amount: amount.raw(),
                max_price,
                depositor: request.depositor,
                gas_limit: None,
            })
        })?;

        let balance = Erc20Client::new(deployment.reserve, &self.transport)
            .balance_of(request.depositor)
            .map(|raw| FixedPoint::new(raw, deployment.reserve_precision))
            .map_err(|err| warn!("{}: balance refresh failed: {err}", request.bond))
            .ok();
        Ok(BondOutcome {
            tx,
            max_price,
            balance,
        })
    }

    /// Claims vested payout. Legacy depositories ignore `recipient` and `autostake`.
    pub fn redeem<R>(
        &self,
        bond: BondId,
        recipient: Address,
        autostake: bool,
        network: NetworkId,
        reporter: &R,
    ) -> Result<TxOutcome>
    where
        R: StatusReporter + ?Sized,
    {
        let deployment = self.registry.bond(network, bond)?;
        let depository = BondDepositoryClient::new(
            deployment.depository,
            deployment.kind.generation(),
            &self.transport,
        );
        self.submit(reporter, CONFIRMED_MESSAGE, || {
            depository.redeem(RedeemArgs {
                recipient,
                autostake,
                gas_limit: None,
            })
        })
    }

    pub fn donate<R>(&self, amount: &str, network: NetworkId, reporter: &R) -> Result<TxOutcome>
    where
        R: StatusReporter + ?Sized,
    {
        let donation = self.registry.donation(network)?;
        let amount = positive_amount(amount, donation.token_precision)?;
        let drive = DonationDriveClient::new(donation.contract, &self.transport);
        self.submit(reporter, CONFIRMED_MESSAGE, || drive.deposit(amount.raw(), None))
    }

    fn submit<R, F>(&self, reporter: &R, done_message: &str, send: F) -> Result<TxOutcome>
    where
        R: StatusReporter + ?Sized,
        F: FnOnce() -> Result<TxHash>,
    {
        reporter.on_status(TxStatus::UserConfirmation, None);
        let tx_hash = send().map_err(|err| fail(reporter, err))?;

        info!("submitted {}", tx_hash.0);
        reporter.on_status(TxStatus::NetworkConfirmation, None);
        let receipt = self
            .transport
            .wait_for_receipt(tx_hash.0, self.confirmations)
            .map_err(|err| fail(reporter, err))?;
        if !receipt.success {
            return Err(fail(
                reporter,
                Error::TransactionReverted {
                    reason: format!("transaction {} reverted", tx_hash.0),
                    cause: None,
                },
            ));
        }

        reporter.on_status(TxStatus::Done, Some(done_message));
        Ok(TxOutcome { tx_hash, receipt })
    }
}

fn positive_amount(amount: &str, precision: Precision) -> Result<FixedPoint> {
    let parsed = FixedPoint::parse(amount, precision)?;
    if parsed.is_zero() {
        return Err(Error::InvalidAmount(format!("{amount:?} must be greater than zero")));
    }
    Ok(parsed)
}

/// Classifies `err`, reports it and hands it back for propagation.
fn fail<R: StatusReporter + ?Sized>(reporter: &R, err: Error) -> Error {
    let err = classify(err);
    let message = match &err {
        Error::UserRejected(_) => USER_REJECTED.to_string(),
        Error::TransactionReverted { reason, .. } => reason.clone(),
        other => other.to_string(),
    };
    warn!("transaction failed: {message}");
    reporter.on_status(TxStatus::Error, Some(&message));
    err
}

fn classify(err: Error) -> Error {
    match err {
        Error::Rpc(failure) if failure.is_user_rejection() => Error::UserRejected(failure),
        Error::Rpc(failure) => Error::TransactionReverted {
            reason: explain(failure.most_specific_message()),
            cause: Some(failure),
        },
        err @ (Error::UserRejected(_) | Error::TransactionReverted { .. }) => err,
        other => Error::TransactionReverted {
            reason: other.to_string(),
            cause: None,
        },
    }
}

fn explain(message: &str) -> String {
    if message.contains(SUB_UNDERFLOW) {
        format!("insufficient balance: the amount exceeds what the account holds ({message})")
    } else {
        message.to_string()
    }
}
