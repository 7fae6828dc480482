//! Bond pricing: discount, payout and capacity quotes from live depository reads.

use core::cmp::Ordering;
use core::fmt;

use alloy_primitives::{I256, U256};
use log::{debug, warn};

use crate::{
    amount::{from_fixed_point, pow10, FixedPoint, Precision},
    contracts::{common::block_number, BondDepositoryClient, BondingCalculatorClient, PairClient},
    error::{Error, Result, RpcFailure},
    registry::{AddressRegistry, BondDeployment, BondId, BondKind, MarketDeployment, NetworkId},
    transport::EvmViewTransport,
};

/// Deposit priced when the caller has not entered an amount yet.
pub const PLACEHOLDER_AMOUNT: &str = "0.0001";

/// Signed fraction `(market - bond) / bond`, held at [`Precision::DISCOUNT`].
///
/// Negative values mean the bond trades at a premium to the market.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Discount(I256);

impl Discount {
    /// `(M * 10^k - P) / P`, where `k` lines the market price up with the
    /// bond price's precision (either side may be the finer one).
    pub fn compute(market_price: FixedPoint, bond_price: FixedPoint) -> Result<Self> {
        if bond_price.is_zero() {
            return Err(Error::Rpc(RpcFailure::new("bond price is zero")));
        }
        let common = market_price.precision().max(bond_price.precision());
        let overflow = || Error::Rpc(RpcFailure::new("discount overflows 256 bits"));
        let market = signed(market_price.rescale(common).raw()).ok_or_else(overflow)?;
        let bond = signed(bond_price.rescale(common).raw()).ok_or_else(overflow)?;
        let scale = signed(Precision::DISCOUNT.scale()).ok_or_else(overflow)?;

        market
            .checked_sub(bond)
            .and_then(|numerator| numerator.checked_mul(scale))
            .and_then(|scaled| scaled.checked_div(bond))
            .map(Self)
            .ok_or_else(overflow)
    }

    /// Discount scaled by `10^18`.
    pub fn raw(&self) -> I256 {
        self.0
    }

    pub fn is_premium(&self) -> bool {
        self.0.is_negative()
    }

    pub fn as_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_negative() {
            f.write_str("-")?;
        }
        f.write_str(&from_fixed_point(self.0.unsigned_abs(), Precision::DISCOUNT))
    }
}

fn signed(value: U256) -> Option<I256> {
    I256::try_from(value).ok()
}

/// Non-fatal findings attached to a quote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuoteWarning {
    /// The candidate deposit would pay out more than the depository allows.
    ExceedsMaxPayout {
        payout: FixedPoint,
        max_payout: FixedPoint,
    },
}

impl fmt::Display for QuoteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExceedsMaxPayout { payout, max_payout } => write!(
                f,
                "payout {payout} exceeds the maximum bond payout of {max_payout}"
            ),
        }
    }
}

/// Price quote for one bond and candidate deposit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BondQuote {
    pub bond: BondId,
    /// Deposit the quote was computed for (the placeholder when none was given).
    pub amount: FixedPoint,
    pub discount: Discount,
    pub debt_ratio: FixedPoint,
    pub max_payout: FixedPoint,
    pub bond_price: FixedPoint,
    pub market_price: FixedPoint,
    /// Vesting term in blocks.
    pub vesting_term: u64,
    pub payout: FixedPoint,
    pub warning: Option<QuoteWarning>,
}

/// Reads the protocol token's market price from the registry's liquidity pair.
pub fn read_market_price<T: EvmViewTransport>(
    market: &MarketDeployment,
    transport: T,
) -> Result<FixedPoint> {
    let reserves = PairClient::new(market.pair, transport).reserves()?;
    let (protocol, quote) = if market.protocol_is_token0 {
        (reserves.reserve0, reserves.reserve1)
    } else {
        (reserves.reserve1, reserves.reserve0)
    };
    if protocol.is_zero() {
        return Err(Error::Rpc(RpcFailure::new("market pair has no protocol reserve")));
    }

    // price = quote / protocol, re-expressed at the price precision
    let exponent = i32::from(market.price_precision.decimals())
        + i32::from(market.protocol_precision.decimals())
        - i32::from(market.quote_precision.decimals());
    let raw = if exponent >= 0 {
        quote
            .checked_mul(pow10(exponent as u8))
            .ok_or_else(|| Error::Rpc(RpcFailure::new("market price overflows 256 bits")))?
            / protocol
    } else {
        quote / protocol.saturating_mul(pow10(exponent.unsigned_abs() as u8))
    };
    Ok(FixedPoint::new(raw, market.price_precision))
}

/// Computes bond quotes against one address registry.
pub struct QuoteEngine<'r, T> {
    registry: &'r AddressRegistry,
    transport: T,
}

impl<'r, T: EvmViewTransport> QuoteEngine<'r, T> {
    pub fn new(registry: &'r AddressRegistry, transport: T) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Quotes `candidate_amount` reserve tokens of `bond` on `network`.
    ///
    /// An empty or zero amount is priced as [`PLACEHOLDER_AMOUNT`] and never
    /// produces a capacity warning. Malformed amounts fail with
    /// [`Error::InvalidAmount`]; any failed read fails with
    /// [`Error::QuoteUnavailable`].
    pub fn compute_bond_quote(
        &self,
        bond: BondId,
        candidate_amount: &str,
        network: NetworkId,
    ) -> Result<BondQuote> {
        let deployment = self.registry.bond(network, bond)?;
        let market = self.registry.market(network)?;

        let requested = match candidate_amount.trim() {
            "" => None,
            amount => {
                Some(FixedPoint::parse(amount, deployment.reserve_precision)?).filter(|a| !a.is_zero())
            }
        };
        let amount = match requested {
            Some(amount) => amount,
            None => FixedPoint::parse(PLACEHOLDER_AMOUNT, deployment.reserve_precision)?,
        };

        self.read_quote(deployment, market, amount, requested.is_some())
            .map_err(Error::quote_unavailable)
    }

    fn read_quote(
        &self,
        deployment: &BondDeployment,
        market: &MarketDeployment,
        amount: FixedPoint,
        check_capacity: bool,
    ) -> Result<BondQuote> {
        let depository = BondDepositoryClient::new(
            deployment.depository,
            deployment.kind.generation(),
            &self.transport,
        );

        let market_price = read_market_price(market, &self.transport)?;
        let terms = depository.terms()?;
        let vesting_term = block_number(terms.vesting_term, "terms.vestingTerm")?;
        let max_payout = FixedPoint::new(depository.max_payout()?, Precision::PROTOCOL_TOKEN);
        let debt_ratio = FixedPoint::new(depository.debt_ratio()?, Precision::DEBT_RATIO);
        let bond_price = FixedPoint::new(
            depository.bond_price_in_usd()?,
            deployment.bond_price_precision,
        );

        let payout_raw = match deployment.kind {
            BondKind::LiquidityPool { calculator, pool } => {
                let valuation = BondingCalculatorClient::new(calculator, &self.transport)
                    .valuation(pool, amount.raw())?;
                debug!("{}: valuation {valuation} for {amount}", deployment.id);
                depository.payout_for(valuation)?
            }
            BondKind::SingleReserve | BondKind::Legacy => depository.payout_for(amount.raw())?,
        };
        let payout = FixedPoint::new(payout_raw, deployment.payout_precision());

        let discount = Discount::compute(market_price, bond_price)?;

        let warning = (check_capacity && payout.cmp_scaled(&max_payout) == Ordering::Greater)
            .then(|| QuoteWarning::ExceedsMaxPayout { payout, max_payout });
        if let Some(warning) = &warning {
            warn!("{}: {warning}", deployment.id);
        }

        Ok(BondQuote {
            bond: deployment.id,
            amount,
            discount,
            debt_ratio,
            max_payout,
            bond_price,
            market_price,
            vesting_term,
            payout,
            warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::bond_depository::BondDepository;
    use crate::contracts::bonding_calculator::BondingCalculator;
    use crate::contracts::pair::LiquidityPair;
    use crate::registry::tests::{sample_registry, SAMPLE_NETWORK};
    use crate::test_support::{encode_terms, uint, words, MockChain};
    use alloy_primitives::{Address, Uint};
    use alloy_sol_types::SolCall;

    const LP_DEPOSITORY: Address = Address::repeat_byte(0x11);
    const DAI_DEPOSITORY: Address = Address::repeat_byte(0x12);
    const CALCULATOR: Address = Address::repeat_byte(0x31);
    const POOL: Address = Address::repeat_byte(0x32);
    const PAIR: Address = Address::repeat_byte(0x50);

    fn e(exp: u8) -> U256 {
        pow10(exp)
    }

    fn stub_market(chain: &MockChain) {
        // token0 = BCT (18 dec), token1 = KLIMA (9 dec); 2.5 BCT per KLIMA
        let reserves = (
            Uint::<112, 2>::from(2_500_000u64) * Uint::<112, 2>::from(1_000_000_000_000_000_000u64),
            Uint::<112, 2>::from(1_000_000u64) * Uint::<112, 2>::from(1_000_000_000u64),
            1_700_000_000u32,
        );
        chain.on_view::<LiquidityPair::getReservesCall>(
            PAIR,
            LiquidityPair::getReservesCall::abi_encode_returns(&reserves),
        );
    }

    fn stub_depository(chain: &MockChain, depository: Address, bond_price_usd: U256) {
        chain.on_view::<BondDepository::termsCall>(depository, encode_terms(33_000));
        chain.on_view::<BondDepository::maxPayoutCall>(depository, uint(U256::from(500u64) * e(9)));
        chain.on_view::<BondDepository::debtRatioCall>(depository, uint(U256::from(150_000_000u64)));
        chain.on_view::<BondDepository::bondPriceInUSDCall>(depository, uint(bond_price_usd));
    }

    #[test]
    fn discount_matches_reference_formula() {
        let market = FixedPoint::new(U256::from(1u64), Precision(0));
        let bond = FixedPoint::new(U256::from(900_000_000u64), Precision(9));
        let discount = Discount::compute(market, bond).unwrap();
        // (10^9 - 9*10^8) / (9*10^8)
        assert_eq!(discount.raw(), I256::from_raw(U256::from(111_111_111_111_111_111u64)));
        assert_eq!(discount.to_string(), "0.111111111111111111");
        assert!((discount.as_f64() - 0.1111).abs() < 1e-3);
        assert!(!discount.is_premium());
    }

    #[test]
    fn discount_is_negative_at_a_premium() {
        let market = FixedPoint::new(U256::from(2u64) * e(9), Precision::PROTOCOL_TOKEN);
        let bond = FixedPoint::new(U256::from(25u64) * e(17), Precision::RESERVE_TOKEN);
        let discount = Discount::compute(market, bond).unwrap();
        assert!(discount.is_premium());
        assert_eq!(discount.to_string(), "-0.2");
    }

    #[test]
    fn discount_accepts_finer_market_price() {
        let market = FixedPoint::new(U256::from(2_200_000_000_000_000_000u64), Precision(18));
        let bond = FixedPoint::new(U256::from(2_000u64), Precision(3));
        assert_eq!(Discount::compute(market, bond).unwrap().to_string(), "0.1");
    }

    #[test]
    fn discount_rejects_zero_bond_price() {
        let market = FixedPoint::new(U256::from(1u64), Precision(0));
        let bond = FixedPoint::zero(Precision(9));
        assert!(Discount::compute(market, bond).is_err());
    }

    #[test]
    fn market_price_is_quote_per_protocol_token() {
        let chain = MockChain::default();
        stub_market(&chain);
        let registry = sample_registry();
        let price = read_market_price(registry.market(SAMPLE_NETWORK).unwrap(), &chain).unwrap();
        assert_eq!(price.precision(), Precision::PROTOCOL_TOKEN);
        assert_eq!(price.to_string(), "2.5");
    }

    #[test]
    fn stablecoin_quote_normalizes_payout_by_reserve_precision() {
        let chain = MockChain::default();
        stub_market(&chain);
        stub_depository(&chain, DAI_DEPOSITORY, U256::from(999_000_000_000_000_000u64));
        let deposit = U256::from(1000u64) * e(18);
        let payout = U256::from(1_001_001u64) * e(15);
        chain.on_view_with_args(
            DAI_DEPOSITORY,
            BondDepository::payoutForCall { value: deposit }.abi_encode(),
            uint(payout),
        );

        let registry = sample_registry();
        // no payout_precision in the registry: single-reserve bonds default to 18
        assert_eq!(
            registry.bond(SAMPLE_NETWORK, BondId::Dai).unwrap().payout_precision,
            None
        );
        let engine = QuoteEngine::new(&registry, &chain);
        let quote = engine
            .compute_bond_quote(BondId::Dai, "1000", SAMPLE_NETWORK)
            .expect("quote");

        assert_eq!(quote.amount.raw(), deposit);
        assert_eq!(quote.payout.precision(), Precision::RESERVE_TOKEN);
        assert_eq!(quote.payout.to_string(), "1001.001");
        assert_eq!(quote.bond_price.to_string(), "0.999");
        assert_eq!(quote.market_price.to_string(), "2.5");
        assert_eq!(quote.max_payout.to_string(), "500");
        assert_eq!(quote.debt_ratio.to_string(), "0.15");
        assert_eq!(quote.vesting_term, 33_000);
        // 1001.001 DAI-denominated payout exceeds the 500 token cap
        assert!(matches!(
            quote.warning,
            Some(QuoteWarning::ExceedsMaxPayout { .. })
        ));
    }

    #[test]
    fn liquidity_pool_quote_with_empty_amount_uses_placeholder() {
        for candidate in ["", "0", "0.0"] {
            let chain = MockChain::default();
            stub_market(&chain);
            stub_depository(&chain, LP_DEPOSITORY, U256::from(2u64) * e(18));
            let placeholder = U256::from(100_000_000_000_000u64);
            chain.on_view_with_args(
                CALCULATOR,
                BondingCalculator::valuationCall {
                    pair: POOL,
                    amount: placeholder,
                }
                .abi_encode(),
                uint(U256::from(7u64) * e(9)),
            );
            chain.on_view_with_args(
                LP_DEPOSITORY,
                BondDepository::payoutForCall {
                    value: U256::from(7u64) * e(9),
                }
                .abi_encode(),
                uint(U256::from(3_500_000_000u64)),
            );

            let registry = sample_registry();
            let engine = QuoteEngine::new(&registry, &chain);
            let quote = engine
                .compute_bond_quote(BondId::KlimaBctLp, candidate, SAMPLE_NETWORK)
                .expect("placeholder quote");

            assert_eq!(quote.amount.to_string(), PLACEHOLDER_AMOUNT);
            assert_eq!(quote.payout.precision(), Precision::PROTOCOL_TOKEN);
            assert_eq!(quote.payout.to_string(), "3.5");
            assert_eq!(quote.warning, None);
            // market 2.5 vs bond 2.0
            assert_eq!(quote.discount.to_string(), "0.25");
        }
    }

    #[test]
    fn liquidity_pool_quote_within_capacity_has_no_warning() {
        let chain = MockChain::default();
        stub_market(&chain);
        stub_depository(&chain, LP_DEPOSITORY, U256::from(2u64) * e(18));
        chain.on_view::<BondingCalculator::valuationCall>(CALCULATOR, uint(U256::from(40u64) * e(9)));
        chain.on_view::<BondDepository::payoutForCall>(LP_DEPOSITORY, uint(U256::from(20u64) * e(9)));

        let registry = sample_registry();
        let quote = QuoteEngine::new(&registry, &chain)
            .compute_bond_quote(BondId::KlimaBctLp, "12.5", SAMPLE_NETWORK)
            .unwrap();
        assert_eq!(quote.payout.to_string(), "20");
        assert_eq!(quote.warning, None);
    }

    #[test]
    fn failed_read_yields_quote_unavailable() {
        let chain = MockChain::default();
        stub_market(&chain);
        stub_depository(&chain, DAI_DEPOSITORY, U256::from(1u64) * e(18));
        chain.fail_view::<BondDepository::payoutForCall>(
            DAI_DEPOSITORY,
            RpcFailure::new("header not found"),
        );

        let registry = sample_registry();
        let err = QuoteEngine::new(&registry, &chain)
            .compute_bond_quote(BondId::Dai, "10", SAMPLE_NETWORK)
            .expect_err("read failure");
        match err {
            Error::QuoteUnavailable(cause) => {
                assert!(matches!(*cause, Error::Rpc(ref failure) if failure.message == "header not found"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversized_vesting_term_is_a_decode_error() {
        let chain = MockChain::default();
        stub_market(&chain);
        stub_depository(&chain, DAI_DEPOSITORY, U256::from(1u64) * e(18));
        chain.on_view::<BondDepository::termsCall>(
            DAI_DEPOSITORY,
            words(&[
                U256::from(40u64),
                U256::from(u64::MAX) + U256::from(1u64),
                U256::from(1_000u64),
                U256::from(50u64),
                U256::from(500u64),
                U256::from(1_000_000_000_000u64),
            ]),
        );
        chain.on_view::<BondDepository::payoutForCall>(DAI_DEPOSITORY, uint(U256::from(1u64)));

        let registry = sample_registry();
        let err = QuoteEngine::new(&registry, &chain)
            .compute_bond_quote(BondId::Dai, "10", SAMPLE_NETWORK)
            .expect_err("vesting term overflows u64");
        match err {
            Error::QuoteUnavailable(cause) => {
                assert!(matches!(*cause, Error::Decode(ref message) if message.contains("vestingTerm")))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_amount_is_rejected_before_any_read() {
        let chain = MockChain::default();
        let registry = sample_registry();
        let err = QuoteEngine::new(&registry, &chain)
            .compute_bond_quote(BondId::Dai, "-5", SAMPLE_NETWORK)
            .expect_err("invalid");
        assert!(matches!(err, Error::InvalidAmount(_)));
        assert!(chain.view_calls().is_empty());
    }

    #[test]
    fn selector_constants_match_encoded_calls() {
        let encoded = BondDepository::bondPriceInUSDCall {}.abi_encode();
        assert_eq!(&encoded[..4], BondDepository::bondPriceInUSDCall::SELECTOR.as_slice());
    }
}
