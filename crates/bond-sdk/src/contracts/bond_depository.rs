use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use crate::{
    contracts::common::{call_view, send_call, TxHash},
    error::Result,
    registry::DepositoryGeneration,
    transport::{EvmTransport, EvmViewTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract BondDepository {
        function terms() view returns (
            uint256 controlVariable,
            uint256 vestingTerm,
            uint256 minimumPrice,
            uint256 maxPayout,
            uint256 fee,
            uint256 maxDebt
        );
        function maxPayout() view returns (uint256);
        function debtRatio() view returns (uint256 debtRatio_);
        function bondPrice() view returns (uint256 price_);
        function bondPriceInUSD() view returns (uint256 price_);
        function payoutFor(uint256 value) view returns (uint256);
        function bondInfo(address depositor) view returns (
            uint256 payout,
            uint256 vesting,
            uint256 lastBlock,
            uint256 pricePaid
        );
        function pendingPayoutFor(address depositor) view returns (uint256 pendingPayout_);
        function deposit(uint256 amount, uint256 maxPrice, address depositor) returns (uint256);
        function redeem(address recipient, bool stake) returns (uint256);
    }
}

sol! {
    #[allow(non_camel_case_types)]
    contract LegacyBondDepository {
        function depositorInfo(address depositor) view returns (
            uint256 principalValue,
            uint256 payoutRemaining,
            uint256 vestingPeriod,
            uint256 lastBlock,
            uint256 pricePaid
        );
        function calculatePendingPayout(address depositor) view returns (uint256 pendingPayout_);
        function redeem() returns (bool);
    }
}

/// Mirrors the depository's `terms()` getter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BondTerms {
    pub control_variable: U256,
    /// Vesting term in blocks.
    pub vesting_term: U256,
    pub minimum_price: U256,
    pub max_payout: U256,
    pub fee: U256,
    pub max_debt: U256,
}

impl From<BondDepository::termsReturn> for BondTerms {
    fn from(value: BondDepository::termsReturn) -> Self {
        Self {
            control_variable: value.controlVariable,
            vesting_term: value.vestingTerm,
            minimum_price: value.minimumPrice,
            max_payout: value.maxPayout,
            fee: value.fee,
            max_debt: value.maxDebt,
        }
    }
}

/// A depositor's outstanding bond, normalized across depository generations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DepositorRecord {
    /// Payout still owed, in protocol-token units.
    pub payout_due: U256,
    /// Blocks left to vest as of `last_block`.
    pub vesting: U256,
    pub last_block: U256,
    pub price_paid: U256,
}

impl DepositorRecord {
    pub fn maturation_block(&self) -> U256 {
        self.last_block.saturating_add(self.vesting)
    }
}

impl From<BondDepository::bondInfoReturn> for DepositorRecord {
    fn from(value: BondDepository::bondInfoReturn) -> Self {
        Self {
            payout_due: value.payout,
            vesting: value.vesting,
            last_block: value.lastBlock,
            price_paid: value.pricePaid,
        }
    }
}

impl From<LegacyBondDepository::depositorInfoReturn> for DepositorRecord {
    fn from(value: LegacyBondDepository::depositorInfoReturn) -> Self {
        Self {
            payout_due: value.payoutRemaining,
            vesting: value.vestingPeriod,
            last_block: value.lastBlock,
            price_paid: value.pricePaid,
        }
    }
}

/// Arguments for `deposit`.
#[derive(Clone, Debug)]
pub struct DepositArgs {
    pub amount: U256,
    pub max_price: U256,
    pub depositor: Address,
    pub gas_limit: Option<u64>,
}

/// Arguments for `redeem`; legacy depositories ignore both fields.
#[derive(Clone, Debug)]
pub struct RedeemArgs {
    pub recipient: Address,
    pub autostake: bool,
    pub gas_limit: Option<u64>,
}

/// Client bound to one bond depository.
#[derive(Clone)]
pub struct BondDepositoryClient<T> {
    depository: Address,
    generation: DepositoryGeneration,
    transport: T,
}

impl<T> BondDepositoryClient<T> {
    pub fn new(depository: Address, generation: DepositoryGeneration, transport: T) -> Self {
        Self {
            depository,
            generation,
            transport,
        }
    }

    pub fn address(&self) -> Address {
        self.depository
    }

    pub fn generation(&self) -> DepositoryGeneration {
        self.generation
    }
}

impl<T: EvmViewTransport> BondDepositoryClient<T> {
    pub fn terms(&self) -> Result<BondTerms> {
        call_view(&self.transport, self.depository, BondDepository::termsCall {}).map(Into::into)
    }

    /// Largest payout a single deposit may receive, in protocol-token units.
    pub fn max_payout(&self) -> Result<U256> {
        call_view(&self.transport, self.depository, BondDepository::maxPayoutCall {})
            .map(|decoded| decoded._0)
    }

    pub fn debt_ratio(&self) -> Result<U256> {
        call_view(&self.transport, self.depository, BondDepository::debtRatioCall {})
            .map(|decoded| decoded.debtRatio_)
    }

    /// Price in the depository's internal units, used to bound `deposit`.
    pub fn bond_price(&self) -> Result<U256> {
        call_view(&self.transport, self.depository, BondDepository::bondPriceCall {})
            .map(|decoded| decoded.price_)
    }

    pub fn bond_price_in_usd(&self) -> Result<U256> {
        call_view(&self.transport, self.depository, BondDepository::bondPriceInUSDCall {})
            .map(|decoded| decoded.price_)
    }

    pub fn payout_for(&self, value: U256) -> Result<U256> {
        call_view(
            &self.transport,
            self.depository,
            BondDepository::payoutForCall { value },
        )
        .map(|decoded| decoded._0)
    }

    pub fn depositor_record(&self, depositor: Address) -> Result<DepositorRecord> {
        match self.generation {
            DepositoryGeneration::Legacy => call_view(
                &self.transport,
                self.depository,
                LegacyBondDepository::depositorInfoCall { depositor },
            )
            .map(Into::into),
            DepositoryGeneration::Current => call_view(
                &self.transport,
                self.depository,
                BondDepository::bondInfoCall { depositor },
            )
            .map(Into::into),
        }
    }

    /// Payout that has vested and can be redeemed now.
    pub fn pending_payout(&self, depositor: Address) -> Result<U256> {
        match self.generation {
            DepositoryGeneration::Legacy => call_view(
                &self.transport,
                self.depository,
                LegacyBondDepository::calculatePendingPayoutCall { depositor },
            )
            .map(|decoded| decoded.pendingPayout_),
            DepositoryGeneration::Current => call_view(
                &self.transport,
                self.depository,
                BondDepository::pendingPayoutForCall { depositor },
            )
            .map(|decoded| decoded.pendingPayout_),
        }
    }
}

impl<T: EvmTransport> BondDepositoryClient<T> {
    pub fn deposit(&self, args: DepositArgs) -> Result<TxHash> {
        let call = BondDepository::depositCall {
            amount: args.amount,
            maxPrice: args.max_price,
            depositor: args.depositor,
        };
        send_call(
            &self.transport,
            self.depository,
            call,
            args.gas_limit.unwrap_or(400_000),
        )
    }

    pub fn redeem(&self, args: RedeemArgs) -> Result<TxHash> {
        let gas_limit = args.gas_limit.unwrap_or(300_000);
        match self.generation {
            DepositoryGeneration::Legacy => send_call(
                &self.transport,
                self.depository,
                LegacyBondDepository::redeemCall {},
                gas_limit,
            ),
            DepositoryGeneration::Current => send_call(
                &self.transport,
                self.depository,
                BondDepository::redeemCall {
                    recipient: args.recipient,
                    stake: args.autostake,
                },
                gas_limit,
            ),
        }
    }
}
