pub mod amounts;

use solana_pubkey::Pubkey;

use crate::error::Error;

/// Schema version this layout describes. Offsets are not self-describing,
/// so any other tag is rejected outright.
pub const RESERVE_VERSION: u8 = 1;

/// Encoded size of the version-1 reserve prefix.
pub const RESERVE_LEN: usize = 1 + LAST_UPDATE_LEN + 32 + 32 + LIQUIDITY_LEN;

const LAST_UPDATE_LEN: usize = 8 + 1;
const LIQUIDITY_LEN: usize = 32 + 1 + 32 + 32 + 32 + 8 + 16 + 16 + 16 + 16 + 1;

const PUBKEY_LEN: usize = 32;

/// How to treat bytes past [`RESERVE_LEN`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrailingBytes {
    #[default]
    Reject,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastUpdate {
    pub slot: u64,
    pub stale: bool,
}

/// Liquidity block of a reserve.
///
/// `*_wads` fields are 18-decimal fixed point. `available_amount` is in the
/// mint's native units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveLiquidity {
    pub mint_pubkey: Pubkey,
    /// As stored on chain. Scaling uses token metadata instead.
    pub mint_decimals: u8,
    pub supply_pubkey: Pubkey,
    pub fee_receiver: Pubkey,
    pub oracle_pubkey: Pubkey,
    pub available_amount: u64,
    pub borrowed_amount_wads: u128,
    pub cumulative_borrow_rate_wads: u128,
    pub market_price: u128,
    pub platform_amount_wads: u128,
    pub platform_fees: u8,
}

/// Decoded Tulip lending reserve account (schema version 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveLayout {
    pub version: u8,
    pub last_update: LastUpdate,
    pub lending_market: Pubkey,
    pub borrow_authorizer: Pubkey,
    pub liquidity: ReserveLiquidity,
}

impl ReserveLayout {
    /// Decode a buffer that must be exactly [`RESERVE_LEN`] bytes.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        if data.len() != RESERVE_LEN {
            return Err(Error::Decode {
                reason: format!(
                    "expected {RESERVE_LEN} bytes for reserve v{RESERVE_VERSION}, got {}",
                    data.len()
                ),
            });
        }
        Self::decode_prefix(data)
    }

    /// Decode the first [`RESERVE_LEN`] bytes and ignore the rest of the
    /// account (collateral and config sections).
    pub fn decode_prefix(data: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(data);

        let version = reader.read_u8("version")?;
        if version != RESERVE_VERSION {
            return Err(Error::Decode {
                reason: format!(
                    "unsupported reserve version {version}, expected {RESERVE_VERSION}"
                ),
            });
        }
        if data.len() < RESERVE_LEN {
            return Err(Error::Decode {
                reason: format!(
                    "reserve buffer truncated: {} of {RESERVE_LEN} bytes",
                    data.len()
                ),
            });
        }

        let last_update = LastUpdate {
            slot: reader.read_u64("last_update.slot")?,
            stale: reader.read_bool("last_update.stale")?,
        };
        let lending_market = reader.read_pubkey("lending_market")?;
        let borrow_authorizer = reader.read_pubkey("borrow_authorizer")?;

        let liquidity = ReserveLiquidity {
            mint_pubkey: reader.read_pubkey("liquidity.mint_pubkey")?,
            mint_decimals: reader.read_u8("liquidity.mint_decimals")?,
            supply_pubkey: reader.read_pubkey("liquidity.supply_pubkey")?,
            fee_receiver: reader.read_pubkey("liquidity.fee_receiver")?,
            oracle_pubkey: reader.read_pubkey("liquidity.oracle_pubkey")?,
            available_amount: reader.read_u64("liquidity.available_amount")?,
            borrowed_amount_wads: reader.read_u128("liquidity.borrowed_amount_wads")?,
            cumulative_borrow_rate_wads: reader
                .read_u128("liquidity.cumulative_borrow_rate_wads")?,
            market_price: reader.read_u128("liquidity.market_price")?,
            platform_amount_wads: reader.read_u128("liquidity.platform_amount_wads")?,
            platform_fees: reader.read_u8("liquidity.platform_fees")?,
        };

        Ok(Self {
            version,
            last_update,
            lending_market,
            borrow_authorizer,
            liquidity,
        })
    }

    /// Decode according to `trailing`.
    pub fn decode_with(data: &[u8], trailing: TrailingBytes) -> Result<Self, Error> {
        match trailing {
            TrailingBytes::Reject => Self::decode(data),
            TrailingBytes::Ignore => Self::decode_prefix(data),
        }
    }

    /// Inverse of [`ReserveLayout::decode`].
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RESERVE_LEN);
        out.push(self.version);
        out.extend_from_slice(&self.last_update.slot.to_le_bytes());
        out.push(u8::from(self.last_update.stale));
        out.extend_from_slice(&self.lending_market.to_bytes());
        out.extend_from_slice(&self.borrow_authorizer.to_bytes());

        let liq = &self.liquidity;
        out.extend_from_slice(&liq.mint_pubkey.to_bytes());
        out.push(liq.mint_decimals);
        out.extend_from_slice(&liq.supply_pubkey.to_bytes());
        out.extend_from_slice(&liq.fee_receiver.to_bytes());
        out.extend_from_slice(&liq.oracle_pubkey.to_bytes());
        out.extend_from_slice(&liq.available_amount.to_le_bytes());
        out.extend_from_slice(&liq.borrowed_amount_wads.to_le_bytes());
        out.extend_from_slice(&liq.cumulative_borrow_rate_wads.to_le_bytes());
        out.extend_from_slice(&liq.market_price.to_le_bytes());
        out.extend_from_slice(&liq.platform_amount_wads.to_le_bytes());
        out.push(liq.platform_fees);
        out
    }
}

/// Forward-only little-endian cursor over an account buffer.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take<const N: usize>(&mut self, field: &str) -> Result<[u8; N], Error> {
        let end = self.offset + N;
        let bytes = self
            .data
            .get(self.offset..end)
            .and_then(|s| <[u8; N]>::try_from(s).ok())
            .ok_or_else(|| Error::Decode {
                reason: format!(
                    "{field} at offset {} needs {N} bytes, buffer has {}",
                    self.offset,
                    self.data.len()
                ),
            })?;
        self.offset = end;
        Ok(bytes)
    }

    fn read_u8(&mut self, field: &str) -> Result<u8, Error> {
        self.take::<1>(field).map(|[b]| b)
    }

    fn read_bool(&mut self, field: &str) -> Result<bool, Error> {
        self.read_u8(field).map(|b| b != 0)
    }

    fn read_u64(&mut self, field: &str) -> Result<u64, Error> {
        self.take::<8>(field).map(u64::from_le_bytes)
    }

    fn read_u128(&mut self, field: &str) -> Result<u128, Error> {
        self.take::<16>(field).map(u128::from_le_bytes)
    }

    fn read_pubkey(&mut self, field: &str) -> Result<Pubkey, Error> {
        self.take::<PUBKEY_LEN>(field).map(Pubkey::new_from_array)
    }
}
