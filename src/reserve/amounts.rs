use rust_decimal::Decimal;

use crate::error::Error;
use crate::reserve::ReserveLiquidity;

/// Scale of the on-chain "wad" fixed-point fields.
pub const WAD_DECIMALS: u32 = 18;

/// Liquidity quantities in human units, plus the ratios the rate model needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveAmounts {
    pub available: Decimal,
    pub borrowed: Decimal,
    pub platform: Decimal,
    /// `available + borrowed - platform`.
    pub remaining: Decimal,
    /// `min(borrowed, remaining)`.
    pub utilized: Decimal,
    /// `utilized / remaining`. Not clamped to `[0, 1]`.
    pub utilization: Decimal,
}

impl ReserveAmounts {
    /// Rescale a decoded liquidity block. `decimals` must come from token
    /// metadata for the mint; the on-chain `mint_decimals` is ignored.
    pub fn from_liquidity(liquidity: &ReserveLiquidity, decimals: u8) -> Result<Self, Error> {
        let available = native_to_decimal(liquidity.available_amount, decimals)?;
        let borrowed = wads_to_decimal(liquidity.borrowed_amount_wads, decimals, "borrowed")?;
        let platform = wads_to_decimal(liquidity.platform_amount_wads, decimals, "platform")?;
        Self::from_parts(available, borrowed, platform)
    }

    pub fn from_parts(
        available: Decimal,
        borrowed: Decimal,
        platform: Decimal,
    ) -> Result<Self, Error> {
        let remaining = available
            .checked_add(borrowed)
            .and_then(|sum| sum.checked_sub(platform))
            .ok_or(Error::Overflow { field: "remaining" })?;

        if remaining.is_zero() {
            return Err(Error::DegenerateUtilization {
                reason: "remaining liquidity is zero".into(),
            });
        }

        let utilized = borrowed.min(remaining);
        let utilization = utilized
            .checked_div(remaining)
            .ok_or(Error::Overflow {
                field: "utilization",
            })?;

        Ok(Self {
            available,
            borrowed,
            platform,
            remaining,
            utilized,
            utilization,
        })
    }

    /// `available + utilized`.
    pub fn tvl(&self) -> Result<Decimal, Error> {
        self.available
            .checked_add(self.utilized)
            .ok_or(Error::Overflow { field: "tvl" })
    }

    /// Share of TVL currently lent out, as published in lending records.
    pub fn reported_utilization(&self) -> Result<Decimal, Error> {
        let tvl = self.tvl()?;
        if tvl.is_zero() {
            return Err(Error::DegenerateUtilization {
                reason: "tvl is zero".into(),
            });
        }
        self.utilized.checked_div(tvl).ok_or(Error::Overflow {
            field: "reported utilization",
        })
    }
}

/// `raw / 10^decimals`, exact.
pub fn native_to_decimal(raw: u64, decimals: u8) -> Result<Decimal, Error> {
    Decimal::try_from_i128_with_scale(i128::from(raw), u32::from(decimals)).map_err(|_| {
        Error::Overflow {
            field: "available",
        }
    })
}

/// Most fractional digits a `Decimal` carries.
const MAX_SCALE: u32 = 28;

/// `raw / 10^18 / 10^decimals`.
///
/// The whole and fractional parts are split in integer space before either
/// is lifted into a `Decimal`, so the full `u128` range converts. Digits past
/// the 28th fractional place are rounded half-to-even.
pub fn wads_to_decimal(raw: u128, decimals: u8, field: &'static str) -> Result<Decimal, Error> {
    let scale = WAD_DECIMALS + u32::from(decimals);
    let (whole, frac) = match 10_u128.checked_pow(scale) {
        Some(unit) => (raw / unit, raw % unit),
        None => (0, raw),
    };
    let (frac, frac_scale) = if scale <= MAX_SCALE {
        (frac, scale)
    } else {
        (round_half_even(frac, scale - MAX_SCALE), MAX_SCALE)
    };

    let whole = lift(whole, 0, field)?;
    let frac = lift(frac, frac_scale, field)?.normalize();
    whole.checked_add(frac).ok_or(Error::Overflow { field })
}

fn lift(value: u128, scale: u32, field: &'static str) -> Result<Decimal, Error> {
    let value = i128::try_from(value).map_err(|_| Error::Overflow { field })?;
    Decimal::try_from_i128_with_scale(value, scale).map_err(|_| Error::Overflow { field })
}

/// `value / 10^digits`, rounded half-to-even.
fn round_half_even(value: u128, digits: u32) -> u128 {
    // 10^digits beyond u128 means value is below half a unit
    let Some(unit) = 10_u128.checked_pow(digits) else {
        return 0;
    };
    let (quotient, rest) = (value / unit, value % unit);
    let half = unit / 2;
    if rest > half || (rest == half && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use rust_decimal::Decimal;
    use solana_pubkey::Pubkey;

    use super::{
        ReserveAmounts, WAD_DECIMALS, native_to_decimal, round_half_even, wads_to_decimal,
    };
    use crate::reserve::ReserveLiquidity;

    const WAD: u128 = 1_000_000_000_000_000_000;

    fn liquidity(available: u64, borrowed_wads: u128, platform_wads: u128) -> ReserveLiquidity {
        let key = Pubkey::new_from_array([9; 32]);
        ReserveLiquidity {
            mint_pubkey: key,
            mint_decimals: 0,
            supply_pubkey: key,
            fee_receiver: key,
            oracle_pubkey: key,
            available_amount: available,
            borrowed_amount_wads: borrowed_wads,
            cumulative_borrow_rate_wads: WAD,
            market_price: 0,
            platform_amount_wads: platform_wads,
            platform_fees: 0,
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn six_decimal_reserve_scenario() {
        let liq = liquidity(1_000_000, 2_000_000 * WAD, 0);
        let amounts = ReserveAmounts::from_liquidity(&liq, 6).unwrap();

        assert_eq!(amounts.available, dec("1"));
        assert_eq!(amounts.borrowed, dec("2"));
        assert_eq!(amounts.remaining, dec("3"));
        assert_eq!(amounts.utilized, dec("2"));
        assert_eq!(amounts.utilization.round_dp(4), dec("0.6667"));
    }

    #[test]
    fn on_chain_mint_decimals_are_ignored() {
        let mut liq = liquidity(1_000_000, 0, 0);
        liq.mint_decimals = 9;
        let amounts = ReserveAmounts::from_liquidity(&liq, 6).unwrap();
        assert_eq!(amounts.available, dec("1"));
    }

    #[test]
    fn zero_borrowed_is_zero_at_any_scale() {
        for decimals in 0..=9 {
            assert!(wads_to_decimal(0, decimals, "borrowed").unwrap().is_zero());
        }
    }

    #[test]
    fn wads_divide_by_both_scales() {
        assert_eq!(
            wads_to_decimal(1_500_000_000 * WAD, 9, "borrowed").unwrap(),
            dec("1.5")
        );
        assert_eq!(wads_to_decimal(1, 0, "borrowed").unwrap(), Decimal::new(1, 18));
    }

    #[test]
    fn native_units_scale_exactly() {
        assert_eq!(native_to_decimal(123_456_789, 9).unwrap(), dec("0.123456789"));
        assert_eq!(native_to_decimal(u64::MAX, 0).unwrap(), Decimal::from(u64::MAX));
    }

    #[test]
    fn full_u128_range_converts() {
        // u128::MAX / 10^24 = 340282366920938.463463374607431768211455
        let max = wads_to_decimal(u128::MAX, 6, "borrowed").unwrap();
        assert_eq!(max.round_dp(6), dec("340282366920938.463463"));
        assert_eq!(
            wads_to_decimal(u128::MAX, 0, "borrowed").unwrap().trunc(),
            dec("340282366920938463463")
        );
    }

    #[test]
    fn large_usdc_reserve_converts_exactly() {
        // 10M USDC borrowed, 2.5M available, 1234.567891 USDC of platform share
        let liq = liquidity(
            2_500_000_000_000,
            10_000_000_000_000 * WAD,
            1_234_567_891 * WAD,
        );
        let amounts = ReserveAmounts::from_liquidity(&liq, 6).unwrap();
        assert_eq!(amounts.available, dec("2500000"));
        assert_eq!(amounts.borrowed, dec("10000000"));
        assert_eq!(amounts.platform, dec("1234.567891"));
        assert_eq!(amounts.remaining, dec("12498765.432109"));
        assert_eq!(amounts.utilized, dec("10000000"));
        assert_eq!(amounts.utilization.round_dp(6), dec("0.800079"));
        assert_eq!(amounts.tvl().unwrap(), dec("12500000"));
    }

    #[test]
    fn hundred_sol_reserve_converts_exactly() {
        let liq = liquidity(25_000_000_000, 100_123_456_789 * WAD + 5_000_000_000, 0);
        let amounts = ReserveAmounts::from_liquidity(&liq, 9).unwrap();
        assert_eq!(amounts.available, dec("25"));
        assert_eq!(amounts.borrowed, dec("100.123456789000000005"));
        assert_eq!(amounts.remaining, dec("125.123456789000000005"));
        assert_eq!(amounts.utilized, amounts.borrowed);
    }

    #[test]
    fn wad_fractions_match_direct_scaling_across_magnitudes() {
        for decimals in 0..=9_u8 {
            for exponent in 0..=38_u32 {
                let raw = 10_u128.pow(exponent) - 1;
                let expected_scale = WAD_DECIMALS + u32::from(decimals);
                let converted = wads_to_decimal(raw, decimals, "borrowed").unwrap();
                if raw < 10_u128.pow(28) {
                    assert_eq!(
                        converted,
                        Decimal::from_i128_with_scale(raw as i128, expected_scale)
                    );
                } else {
                    assert!(converted > Decimal::ZERO);
                }
            }
        }
    }

    #[test]
    fn excess_digits_round_half_to_even() {
        assert_eq!(round_half_even(125, 1), 12);
        assert_eq!(round_half_even(135, 1), 14);
        assert_eq!(round_half_even(136, 1), 14);
        assert_eq!(round_half_even(u128::MAX, 39), 0);
        // a 30-digit scale keeps 28 fractional digits
        let tie_even = 456_789_012_345_678_901_234_567_890_250_u128;
        assert_eq!(
            wads_to_decimal(tie_even, 12, "platform").unwrap(),
            dec("0.4567890123456789012345678902")
        );
        let tie_odd = 456_789_012_345_678_901_234_567_890_350_u128;
        assert_eq!(
            wads_to_decimal(tie_odd, 12, "platform").unwrap(),
            dec("0.4567890123456789012345678904")
        );
    }

    #[test]
    fn platform_share_reduces_remaining() {
        let liq = liquidity(1_000_000, 2_000_000 * WAD, 1_000_000 * WAD);
        let amounts = ReserveAmounts::from_liquidity(&liq, 6).unwrap();
        assert_eq!(amounts.remaining, dec("2"));
        assert_eq!(amounts.utilized, dec("2"));
        assert_eq!(amounts.utilization, Decimal::ONE);
        assert_eq!(amounts.tvl().unwrap(), dec("3"));
        assert_eq!(
            amounts.reported_utilization().unwrap().round_dp(4),
            dec("0.6667")
        );
    }

    #[test]
    fn zero_tvl_leaves_reported_utilization_undefined() {
        // platform = 2 * available + borrowed drives utilized to -available
        let liq = liquidity(1_000_000, 0, 2_000_000 * WAD);
        let amounts = ReserveAmounts::from_liquidity(&liq, 6).unwrap();
        assert_eq!(amounts.utilized, dec("-1"));
        assert!(amounts.tvl().unwrap().is_zero());
        let err = amounts.reported_utilization().unwrap_err();
        assert!(err.to_string().contains("tvl is zero"));
    }

    #[test]
    fn zero_remaining_is_degenerate() {
        let liq = liquidity(0, 0, 0);
        let err = ReserveAmounts::from_liquidity(&liq, 6).unwrap_err();
        assert!(err.to_string().contains("degenerate utilization"));

        let liq = liquidity(1_000_000, 0, 1_000_000 * WAD);
        assert!(ReserveAmounts::from_liquidity(&liq, 6).is_err());
    }

    #[test]
    fn utilization_is_not_clamped_when_platform_exceeds_liquidity() {
        // remaining < 0 makes utilized == remaining, so the ratio pins at one
        let liq = liquidity(0, 1_000_000 * WAD, 3_000_000 * WAD);
        let amounts = ReserveAmounts::from_liquidity(&liq, 6).unwrap();
        assert_eq!(amounts.remaining, dec("-2"));
        assert_eq!(amounts.utilized, dec("-2"));
        assert_eq!(amounts.utilization, Decimal::ONE);
    }
}
