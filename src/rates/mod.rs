use rust_decimal::{Decimal, MathematicalOps};

use crate::error::Error;
use crate::reserve::amounts::ReserveAmounts;

/// Samples per day at the ~10 minute cadence the model compounds at.
pub const SAMPLES_PER_DAY: u64 = 144;

pub const DAYS_PER_YEAR: u64 = 365;

/// Compounding horizons, in samples.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Duration {
    Daily,
    Weekly,
    Yearly,
}

impl Duration {
    pub fn periods(self) -> u64 {
        match self {
            Self::Daily => SAMPLES_PER_DAY,
            Self::Weekly => SAMPLES_PER_DAY * 7,
            Self::Yearly => SAMPLES_PER_DAY * DAYS_PER_YEAR,
        }
    }
}

/// Which kink rate a reserve's curve uses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ReserveClass {
    /// The flagship pool.
    Primary,
    Standard,
}

impl ReserveClass {
    pub fn kink_rate(self) -> Decimal {
        match self {
            Self::Primary => Decimal::from(35),
            Self::Standard => Decimal::from(25),
        }
    }
}

/// Three-segment borrow curve, all values in percent.
///
/// ```text
///   0..=50   ->  0 .. 15
///  50..=90   -> 15 .. kink_rate
///  90..      -> kink_rate .. ceiling (at 100, extrapolated beyond)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateCurve {
    pub kink_rate: Decimal,
    pub ceiling: Decimal,
}

const OPTIMAL_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 0);
const FIRST_KINK: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
const SECOND_KINK: Decimal = Decimal::from_parts(90, 0, 0, false, 0);
const STANDARD_CEILING: Decimal = Decimal::ONE_HUNDRED;
const VOLATILE_CEILING: Decimal = Decimal::from_parts(150, 0, 0, false, 0);

impl RateCurve {
    pub fn new(class: ReserveClass, volatile: bool) -> Self {
        Self {
            kink_rate: class.kink_rate(),
            ceiling: if volatile {
                VOLATILE_CEILING
            } else {
                STANDARD_CEILING
            },
        }
    }

    /// Borrow APR in percent for a utilization fraction.
    ///
    /// Utilization above one is extrapolated along the last segment.
    /// `None` when the arithmetic leaves the decimal range.
    pub fn borrow_apr(&self, utilization: Decimal) -> Option<Decimal> {
        let rate = utilization.checked_mul(Decimal::ONE_HUNDRED)?;
        if rate <= FIRST_KINK {
            self.low_segment(rate)
        } else if rate <= SECOND_KINK {
            self.mid_segment(rate)
        } else {
            self.high_segment(rate)
        }
    }

    #[expect(clippy::unused_self, reason = "uniform segment signatures")]
    pub(crate) fn low_segment(&self, rate: Decimal) -> Option<Decimal> {
        rate.checked_div(FIRST_KINK)?.checked_mul(OPTIMAL_RATE)
    }

    pub(crate) fn mid_segment(&self, rate: Decimal) -> Option<Decimal> {
        rate.checked_sub(FIRST_KINK)?
            .checked_div(SECOND_KINK - FIRST_KINK)?
            .checked_mul(self.kink_rate.checked_sub(OPTIMAL_RATE)?)?
            .checked_add(OPTIMAL_RATE)
    }

    pub(crate) fn high_segment(&self, rate: Decimal) -> Option<Decimal> {
        rate.checked_sub(SECOND_KINK)?
            .checked_div(Decimal::ONE_HUNDRED - SECOND_KINK)?
            .checked_mul(self.ceiling.checked_sub(self.kink_rate)?)?
            .checked_add(self.kink_rate)
    }
}

/// Compound a daily percentage rate over `periods` samples.
///
/// `((daily_rate / 144 / 100 + 1) ^ periods - 1) * 100`, with exact integer
/// exponentiation. `None` on overflow.
pub fn compound(daily_rate: Decimal, periods: u64) -> Option<Decimal> {
    let per_sample = daily_rate
        .checked_div(Decimal::from(SAMPLES_PER_DAY))?
        .checked_div(Decimal::ONE_HUNDRED)?;
    per_sample
        .checked_add(Decimal::ONE)?
        .checked_powu(periods)?
        .checked_sub(Decimal::ONE)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Rates derived for one reserve. APR in percent, APYs as fractions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveRates {
    pub borrow_apr: Decimal,
    pub daily_borrow_rate: Decimal,
    pub daily_lending_rate: Decimal,
    pub borrow_apy: Decimal,
    pub lend_apy: Decimal,
}

impl ReserveRates {
    pub fn derive(utilization: Decimal, curve: &RateCurve) -> Result<Self, Error> {
        let undefined = |stage: &str| Error::UndefinedRate {
            reason: format!("{stage} out of range at utilization {utilization}"),
        };
        let periods = Duration::Yearly.periods();

        let borrow_apr = curve
            .borrow_apr(utilization)
            .ok_or_else(|| undefined("borrow apr"))?;
        let daily_borrow_rate = borrow_apr
            .checked_div(Decimal::from(DAYS_PER_YEAR))
            .ok_or_else(|| undefined("daily borrow rate"))?;
        let daily_lending_rate = utilization
            .checked_mul(daily_borrow_rate)
            .ok_or_else(|| undefined("daily lending rate"))?;
        let borrow_apy = compound(daily_borrow_rate, periods)
            .and_then(|c| c.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| undefined("borrow apy"))?;
        let lend_apy = compound(daily_lending_rate, periods)
            .and_then(|c| c.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| undefined("lend apy"))?;

        Ok(Self {
            borrow_apr,
            daily_borrow_rate,
            daily_lending_rate,
            borrow_apy,
            lend_apy,
        })
    }

    pub fn for_amounts(amounts: &ReserveAmounts, curve: &RateCurve) -> Result<Self, Error> {
        Self::derive(amounts.utilization, curve)
    }
}
