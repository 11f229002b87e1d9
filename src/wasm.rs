use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::{AggregatorConfig, pubkey_to_string};
use crate::rates::{self, Duration, RateCurve, ReserveClass, ReserveRates};
use crate::reserve::ReserveLayout;
use crate::reserve::amounts::ReserveAmounts;
use crate::types::round_output;

fn to_js(value: &serde_json::Value) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

fn error_result(msg: &str) -> JsValue {
    to_js(&serde_json::json!({ "error": msg }))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    s.trim().parse::<Decimal>().ok()
}

fn decimal_str(value: Decimal) -> String {
    round_output(value).to_string()
}

/// Decode a raw reserve account into a JSON object.
///
/// Pass `ignore_trailing = true` for live accounts that carry data past the
/// liquidity block.
#[wasm_bindgen]
pub fn decode_reserve(data: &[u8], ignore_trailing: bool) -> JsValue {
    let decoded = if ignore_trailing {
        ReserveLayout::decode_prefix(data)
    } else {
        ReserveLayout::decode(data)
    };
    let layout = match decoded {
        Ok(l) => l,
        Err(e) => return error_result(&e.to_string()),
    };
    let liq = &layout.liquidity;
    to_js(&serde_json::json!({
        "version": layout.version,
        "lastUpdate": {
            "slot": layout.last_update.slot.to_string(),
            "stale": layout.last_update.stale,
        },
        "lendingMarket": pubkey_to_string(&layout.lending_market),
        "borrowAuthorizer": pubkey_to_string(&layout.borrow_authorizer),
        "liquidity": {
            "mintPubKey": pubkey_to_string(&liq.mint_pubkey),
            "mintDecimals": liq.mint_decimals,
            "supplyPubKey": pubkey_to_string(&liq.supply_pubkey),
            "feeReceiver": pubkey_to_string(&liq.fee_receiver),
            "oraclePubKey": pubkey_to_string(&liq.oracle_pubkey),
            "availableAmount": liq.available_amount.to_string(),
            "borrowedAmount": liq.borrowed_amount_wads.to_string(),
            "cumulativeBorrowRate": liq.cumulative_borrow_rate_wads.to_string(),
            "marketPrice": liq.market_price.to_string(),
            "platformAmountWads": liq.platform_amount_wads.to_string(),
            "platformFees": liq.platform_fees,
        },
    }))
}

/// Borrow APR (percent) for a utilization fraction given as a decimal string.
#[wasm_bindgen]
pub fn borrow_apr(utilization: &str, reserve_class: &str, volatile: bool) -> JsValue {
    let Some(utilization) = parse_decimal(utilization) else {
        return error_result("Invalid utilization");
    };
    let Ok(class) = reserve_class.parse::<ReserveClass>() else {
        return error_result("Unknown reserve class, expected primary or standard");
    };
    match RateCurve::new(class, volatile).borrow_apr(utilization) {
        Some(apr) => JsValue::from_str(&decimal_str(apr)),
        None => JsValue::NULL,
    }
}

/// Compound a daily percentage rate over `daily`, `weekly` or `yearly`.
#[wasm_bindgen]
pub fn compound_rate(daily_rate: &str, duration: &str) -> JsValue {
    let Some(daily_rate) = parse_decimal(daily_rate) else {
        return error_result("Invalid rate");
    };
    let Ok(duration) = duration.parse::<Duration>() else {
        return error_result("Unknown duration, expected daily, weekly or yearly");
    };
    match rates::compound(daily_rate, duration.periods()) {
        Some(v) => JsValue::from_str(&decimal_str(v)),
        None => JsValue::NULL,
    }
}

/// Full per-reserve computation using the default Tulip config.
#[wasm_bindgen]
pub fn reserve_rates(data: &[u8], decimals: u8, reserve_name: &str) -> JsValue {
    let config = AggregatorConfig::default();
    let result = ReserveLayout::decode_with(data, config.trailing_bytes)
        .and_then(|layout| ReserveAmounts::from_liquidity(&layout.liquidity, decimals))
        .and_then(|amounts| {
            let rates = ReserveRates::for_amounts(&amounts, &config.curve_for(reserve_name))?;
            Ok((amounts, rates))
        });
    let (amounts, model) = match result {
        Ok(r) => r,
        Err(e) => return error_result(&e.to_string()),
    };
    let tvl = match amounts.tvl() {
        Ok(t) => t,
        Err(e) => return error_result(&e.to_string()),
    };
    to_js(&serde_json::json!({
        "availableAmount": decimal_str(amounts.available),
        "borrowedAmount": decimal_str(amounts.borrowed),
        "remainingAmount": decimal_str(amounts.remaining),
        "utilizedAmount": decimal_str(amounts.utilized),
        "utilization": decimal_str(amounts.utilization),
        "tvl": decimal_str(tvl),
        "borrowApr": decimal_str(model.borrow_apr),
        "borrowApy": decimal_str(model.borrow_apy),
        "lendApy": decimal_str(model.lend_apy),
    }))
}
