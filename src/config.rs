use serde::{Deserialize, Deserializer};
use solana_pubkey::Pubkey;

use crate::aggregator::token_list::Cluster;
use crate::error::Error;
use crate::rates::{RateCurve, ReserveClass};
use crate::reserve::TrailingBytes;

pub const TULIP_PROTOCOL: &str = "tulip";

const FLAGSHIP_RESERVE: &str = "RAY";

const VOLATILE_RESERVES: &[&str] = &[
    "ORCA", "whETH", "mSOL", "BTC", "GENE", "SAMO", "DFL", "CAVE", "REAL", "wbWBNB", "MBS",
    "SHDW", "BASIS",
];

/// One known reserve: where its account lives and which mint it lends.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReserveDescriptor {
    #[serde(deserialize_with = "deserialize_pubkey")]
    pub account: Pubkey,
    #[serde(
        rename = "liquidity_supply_token_mint",
        alias = "mint",
        deserialize_with = "deserialize_pubkey"
    )]
    pub mint: Pubkey,
    pub name: String,
}

#[derive(Deserialize)]
struct ReserveTable {
    lending: LendingSection,
}

#[derive(Deserialize)]
struct LendingSection {
    reserves: Vec<ReserveDescriptor>,
}

/// Parse a reserve table. Accepts either a bare array of descriptors or the
/// `{"lending": {"reserves": [..]}}` document shipped with the Tulip SDK.
pub fn parse_descriptors(json: &str) -> Result<Vec<ReserveDescriptor>, Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }
    let table: ReserveTable = serde_json::from_value(value)?;
    Ok(table.lending.reserves)
}

/// Knobs for an aggregation run. `Default` carries the Tulip values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Tag written into the output envelope.
    pub protocol: String,
    /// Reserve name that gets the [`ReserveClass::Primary`] curve.
    pub flagship_reserve: String,
    /// Reserve names whose curve tops out at 150 instead of 100.
    pub volatile_reserves: Vec<String>,
    pub trailing_bytes: TrailingBytes,
    /// Token-list cluster used to resolve mints.
    pub cluster: Cluster,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            protocol: TULIP_PROTOCOL.to_string(),
            flagship_reserve: FLAGSHIP_RESERVE.to_string(),
            volatile_reserves: VOLATILE_RESERVES.iter().map(|s| (*s).to_string()).collect(),
            trailing_bytes: TrailingBytes::default(),
            cluster: Cluster::default(),
        }
    }
}

impl AggregatorConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        if config.protocol.is_empty() {
            return Err(Error::Config {
                reason: "protocol must not be empty".into(),
            });
        }
        Ok(config)
    }

    pub fn reserve_class(&self, name: &str) -> ReserveClass {
        if name == self.flagship_reserve {
            ReserveClass::Primary
        } else {
            ReserveClass::Standard
        }
    }

    pub fn is_volatile(&self, name: &str) -> bool {
        self.volatile_reserves.iter().any(|v| v == name)
    }

    pub fn curve_for(&self, name: &str) -> RateCurve {
        RateCurve::new(self.reserve_class(name), self.is_volatile(name))
    }
}

pub(crate) fn parse_pubkey(s: &str) -> Result<Pubkey, Error> {
    let bytes = bs58::decode(s).into_vec().map_err(|e| Error::Config {
        reason: format!("invalid pubkey {s}: {e}"),
    })?;
    let bytes = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| Error::Config {
        reason: format!("pubkey {s} decodes to {} bytes", bytes.len()),
    })?;
    Ok(Pubkey::new_from_array(bytes))
}

pub(crate) fn pubkey_to_string(key: &Pubkey) -> String {
    bs58::encode(key.to_bytes()).into_string()
}

fn deserialize_pubkey<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_pubkey(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::{AggregatorConfig, parse_descriptors, parse_pubkey, pubkey_to_string};
    use crate::aggregator::token_list::Cluster;
    use crate::rates::ReserveClass;
    use crate::reserve::TrailingBytes;

    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const RAY_MINT: &str = "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R";

    #[test]
    fn pubkeys_roundtrip_through_base58() {
        let key = parse_pubkey(USDC_MINT).unwrap();
        assert_eq!(pubkey_to_string(&key), USDC_MINT);
        assert!(parse_pubkey("not-base58!").is_err());
        assert!(parse_pubkey("11111111").is_err());
    }

    #[test]
    fn parses_sdk_reserve_table() {
        let json = serde_json::json!({
            "lending": {
                "reserves": [
                    {
                        "account": RAY_MINT,
                        "liquidity_supply_token_mint": RAY_MINT,
                        "name": "RAY",
                        "decimals": 6
                    },
                    {
                        "account": USDC_MINT,
                        "liquidity_supply_token_mint": USDC_MINT,
                        "name": "USDC"
                    }
                ]
            }
        })
        .to_string();

        let descriptors = parse_descriptors(&json).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "RAY");
        assert_eq!(pubkey_to_string(&descriptors[1].mint), USDC_MINT);
    }

    #[test]
    fn parses_bare_descriptor_array() {
        let json = serde_json::json!([
            { "account": USDC_MINT, "mint": USDC_MINT, "name": "USDC" }
        ])
        .to_string();
        let descriptors = parse_descriptors(&json).unwrap();
        assert_eq!(descriptors[0].name, "USDC");
    }

    #[test]
    fn rejects_descriptor_with_bad_key() {
        let json = serde_json::json!([
            { "account": "bogus", "mint": USDC_MINT, "name": "USDC" }
        ])
        .to_string();
        assert!(parse_descriptors(&json).is_err());
    }

    #[test]
    fn default_config_classifies_tulip_reserves() {
        let config = AggregatorConfig::default();
        assert_eq!(config.protocol, "tulip");
        assert_eq!(config.reserve_class("RAY"), ReserveClass::Primary);
        assert_eq!(config.reserve_class("USDC"), ReserveClass::Standard);
        assert!(config.is_volatile("mSOL"));
        assert!(!config.is_volatile("USDC"));
        assert!(!config.is_volatile("RAY"));

        let samo = config.curve_for("SAMO");
        assert_eq!(samo.ceiling, rust_decimal::Decimal::from(150));
    }

    #[test]
    fn partial_json_config_keeps_defaults() {
        let config =
            AggregatorConfig::from_json(r#"{"trailing_bytes": "ignore", "cluster": "devnet"}"#)
                .unwrap();
        assert_eq!(config.trailing_bytes, TrailingBytes::Ignore);
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.flagship_reserve, "RAY");
        assert!(AggregatorConfig::from_json(r#"{"protocol": ""}"#).is_err());
    }
}
