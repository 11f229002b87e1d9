#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod aggregator;
pub mod config;
pub mod error;
pub mod rates;
pub mod reserve;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use aggregator::providers::{
    AccountDataProvider, InMemoryAccounts, StaticTokenMetadata, TokenMetadataLookup,
};
pub use aggregator::token_list::{
    Cluster, StaticTokenList, TokenInfo, TokenListCache, TokenListSource, TokenRegistry,
    global_cache, reset_global_cache,
};
pub use aggregator::{Aggregator, resolve_reserve};
pub use config::{AggregatorConfig, ReserveDescriptor, parse_descriptors};
pub use error::Error;
pub use rates::{Duration, RateCurve, ReserveClass, ReserveRates, compound};
pub use reserve::amounts::ReserveAmounts;
pub use reserve::{
    LastUpdate, RESERVE_LEN, RESERVE_VERSION, ReserveLayout, ReserveLiquidity, TrailingBytes,
};
pub use types::{LendingRecord, LendingReport, ResolvedReserve, TokenMetadata};
