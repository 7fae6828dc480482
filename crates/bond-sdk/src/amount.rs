//! Conversions between human-readable decimals and on-chain fixed-point integers.

use core::cmp::Ordering;
use core::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of decimal places an integer amount is scaled by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Precision(pub u8);

impl Precision {
    /// The protocol token and every amount denominated in it (payouts, max payout).
    pub const PROTOCOL_TOKEN: Self = Self(9);
    /// Reserve tokens and LP tokens accepted by the bonds.
    pub const RESERVE_TOKEN: Self = Self(18);
    /// `debtRatio()` is reported as a 9-decimal fraction.
    pub const DEBT_RATIO: Self = Self(9);
    /// Internal precision of the signed discount fraction.
    pub const DISCOUNT: Self = Self(18);

    pub fn decimals(self) -> u8 {
        self.0
    }

    /// `10^decimals` as a 256-bit integer.
    pub fn scale(self) -> U256 {
        pow10(self.0)
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} decimals", self.0)
    }
}

pub(crate) fn pow10(exp: u8) -> U256 {
    U256::from(10u8).pow(U256::from(exp))
}

/// Parses a non-negative decimal string into its integer form at `precision`.
pub fn to_fixed_point(decimal: &str, precision: Precision) -> Result<U256> {
    let trimmed = decimal.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAmount("empty amount".into()));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(Error::InvalidAmount(format!("`{trimmed}` is not a number")));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(Error::InvalidAmount(format!(
            "`{trimmed}` is not a non-negative decimal number"
        )));
    }
    if fraction.len() > precision.decimals() as usize {
        return Err(Error::InvalidAmount(format!(
            "`{trimmed}` has more than {} fractional digits",
            precision.decimals()
        )));
    }

    let overflow = || Error::InvalidAmount(format!("`{trimmed}` does not fit in 256 bits"));
    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| overflow())?
    };
    let mut padded = fraction.to_string();
    padded.extend(core::iter::repeat('0').take(precision.decimals() as usize - fraction.len()));
    let fraction = if padded.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(&padded, 10).map_err(|_| overflow())?
    };

    whole
        .checked_mul(precision.scale())
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Formats an integer amount at `precision` in canonical decimal form.
///
/// Trailing fractional zeros and a dangling point are dropped, so `1.5`
/// formats as `"1.5"` and `1` as `"1"`.
pub fn from_fixed_point(raw: U256, precision: Precision) -> String {
    let scale = precision.scale();
    let whole = raw / scale;
    let fraction = raw % scale;
    if fraction.is_zero() {
        return whole.to_string();
    }
    let digits = fraction.to_string();
    let mut fraction = "0".repeat(precision.decimals() as usize - digits.len());
    fraction.push_str(&digits);
    let fraction = fraction.trim_end_matches('0');
    format!("{whole}.{fraction}")
}

/// Integer amount tagged with the precision it is denominated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    raw: U256,
    precision: Precision,
}

impl FixedPoint {
    pub fn new(raw: U256, precision: Precision) -> Self {
        Self { raw, precision }
    }

    pub fn zero(precision: Precision) -> Self {
        Self::new(U256::ZERO, precision)
    }

    pub fn parse(decimal: &str, precision: Precision) -> Result<Self> {
        to_fixed_point(decimal, precision).map(|raw| Self::new(raw, precision))
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Re-expresses the amount at `target`, truncating digits that no longer fit.
    pub fn rescale(&self, target: Precision) -> Self {
        let raw = match self.precision.cmp(&target) {
            Ordering::Equal => self.raw,
            Ordering::Less => self
                .raw
                .saturating_mul(pow10(target.decimals() - self.precision.decimals())),
            Ordering::Greater => self.raw / pow10(self.precision.decimals() - target.decimals()),
        };
        Self::new(raw, target)
    }

    /// Compares two amounts after lifting both to the finer precision.
    pub fn cmp_scaled(&self, other: &Self) -> Ordering {
        let common = self.precision.max(other.precision);
        self.rescale(common).raw.cmp(&other.rescale(common).raw)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&from_fixed_point(self.raw, self.precision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_decimals_round_trip() {
        let cases = [
            ("0", Precision::RESERVE_TOKEN),
            ("1000", Precision::RESERVE_TOKEN),
            ("0.0001", Precision::RESERVE_TOKEN),
            ("12.5", Precision::PROTOCOL_TOKEN),
            ("0.000000001", Precision::PROTOCOL_TOKEN),
            ("999999999.123456789012345678", Precision::RESERVE_TOKEN),
            ("42", Precision(0)),
        ];
        for (decimal, precision) in cases {
            let raw = to_fixed_point(decimal, precision).expect("parse");
            assert_eq!(from_fixed_point(raw, precision), decimal, "{decimal}");
        }
    }

    #[test]
    fn parse_scales_by_precision() {
        assert_eq!(
            to_fixed_point("1000", Precision::RESERVE_TOKEN).unwrap(),
            U256::from(1000u64) * U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(
            to_fixed_point("1.5", Precision::PROTOCOL_TOKEN).unwrap(),
            U256::from(1_500_000_000u64)
        );
        assert_eq!(
            to_fixed_point(" .5 ", Precision::PROTOCOL_TOKEN).unwrap(),
            U256::from(500_000_000u64)
        );
        assert_eq!(
            to_fixed_point("5.", Precision::PROTOCOL_TOKEN).unwrap(),
            U256::from(5_000_000_000u64)
        );
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["", "  ", ".", "-1", "+1", "1e18", "1.2.3", "abc", "1,5"] {
            let err = to_fixed_point(bad, Precision::RESERVE_TOKEN).expect_err(bad);
            assert!(matches!(err, Error::InvalidAmount(_)), "{bad}");
        }
    }

    #[test]
    fn parse_rejects_excess_fraction_digits() {
        let err = to_fixed_point("0.0000000001", Precision::PROTOCOL_TOKEN).expect_err("digits");
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn parse_rejects_overflow() {
        let huge = "1".repeat(80);
        assert!(to_fixed_point(&huge, Precision::RESERVE_TOKEN).is_err());
    }

    #[test]
    fn format_drops_trailing_zeros() {
        assert_eq!(
            from_fixed_point(U256::from(1_250_000_000u64), Precision::PROTOCOL_TOKEN),
            "1.25"
        );
        assert_eq!(from_fixed_point(U256::from(1u64), Precision::RESERVE_TOKEN), "0.000000000000000001");
        assert_eq!(from_fixed_point(U256::ZERO, Precision::RESERVE_TOKEN), "0");
    }

    #[test]
    fn rescale_and_compare_across_precisions() {
        let payout = FixedPoint::parse("12.5", Precision::RESERVE_TOKEN).unwrap();
        let max = FixedPoint::parse("12", Precision::PROTOCOL_TOKEN).unwrap();
        assert_eq!(payout.cmp_scaled(&max), Ordering::Greater);
        assert_eq!(max.cmp_scaled(&payout), Ordering::Less);

        let lifted = max.rescale(Precision::RESERVE_TOKEN);
        assert_eq!(lifted.to_string(), "12");
        assert_eq!(lifted.precision(), Precision::RESERVE_TOKEN);

        let truncated = FixedPoint::new(U256::from(1_999_999_999u64), Precision::RESERVE_TOKEN)
            .rescale(Precision::PROTOCOL_TOKEN);
        assert_eq!(truncated.raw(), U256::from(1u64));
    }
}
