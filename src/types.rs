use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use solana_pubkey::Pubkey;

/// Fractional digits kept in published lending records.
pub const OUTPUT_SCALE: u32 = 12;

/// Token metadata needed to scale a reserve's amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

/// A fully resolved reserve. Built once per fetch cycle, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReserve {
    /// Descriptor name (e.g. `"RAY"`).
    pub name: String,
    /// Symbol from token metadata.
    pub symbol: String,
    pub mint: Pubkey,
    pub available_amount: Decimal,
    pub utilized_amount: Decimal,
    /// `available_amount + utilized_amount`.
    pub tvl: Decimal,
    /// Rate-model utilization, `utilized / remaining`.
    pub utilization: Decimal,
    /// `utilized_amount / tvl`.
    pub tvl_utilization: Decimal,
    /// Percent.
    pub borrow_apr: Decimal,
    pub borrow_apy: Decimal,
    pub lend_apy: Decimal,
}

impl ResolvedReserve {
    pub fn to_record(&self) -> LendingRecord {
        LendingRecord {
            symbol: self.symbol.clone(),
            apy: round_output(self.lend_apy),
            tvl: round_output(self.tvl),
            utilization: round_output(self.tvl_utilization),
        }
    }
}

/// Banker's rounding to [`OUTPUT_SCALE`], trailing zeros stripped.
pub fn round_output(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(OUTPUT_SCALE, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Per-reserve output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LendingRecord {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub apy: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tvl: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub utilization: Decimal,
}

/// Aggregation output envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LendingReport {
    pub protocol: String,
    pub lending: Vec<LendingRecord>,
}
