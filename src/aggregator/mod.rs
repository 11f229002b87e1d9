pub mod providers;
pub mod token_list;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::aggregator::providers::{AccountDataProvider, TokenMetadataLookup};
use crate::config::{AggregatorConfig, ReserveDescriptor, pubkey_to_string};
use crate::error::Error;
use crate::rates::ReserveRates;
use crate::reserve::ReserveLayout;
use crate::reserve::amounts::ReserveAmounts;
use crate::types::{LendingReport, ResolvedReserve, TokenMetadata};

/// Joins reserve descriptors, token metadata and raw account data into
/// per-reserve rates.
pub struct Aggregator<P, L> {
    config: AggregatorConfig,
    descriptors: Vec<ReserveDescriptor>,
    accounts: P,
    tokens: L,
}

impl<P, L> Aggregator<P, L>
where
    P: AccountDataProvider,
    L: TokenMetadataLookup,
{
    pub fn new(
        config: AggregatorConfig,
        descriptors: Vec<ReserveDescriptor>,
        accounts: P,
        tokens: L,
    ) -> Self {
        Self {
            config,
            descriptors,
            accounts,
            tokens,
        }
    }

    /// Resolve every reserve that can be fully resolved, in descriptor order.
    ///
    /// Per-reserve failures drop that reserve. Only a failing lookup service
    /// or account provider fails the whole call.
    pub async fn resolve_reserves(&self) -> Result<Vec<ResolvedReserve>, Error> {
        let lookups = join_all(self.descriptors.iter().map(|descriptor| async move {
            let metadata = self.tokens.resolve(&descriptor.mint).await;
            (descriptor, metadata)
        }))
        .await;

        let mut known = Vec::with_capacity(lookups.len());
        for (descriptor, metadata) in lookups {
            match metadata? {
                Some(metadata) => known.push((descriptor, metadata)),
                None => {
                    let err = Error::UnresolvedMetadata {
                        mint: pubkey_to_string(&descriptor.mint),
                    };
                    debug!(reserve = %descriptor.name, error = %err, "dropping reserve");
                }
            }
        }
        let unresolved = self.descriptors.len() - known.len();

        if known.is_empty() {
            info!(
                protocol = %self.config.protocol,
                resolved = 0,
                skipped = unresolved,
                "no reserves with known metadata"
            );
            return Ok(Vec::new());
        }

        let keys: Vec<_> = known.iter().map(|(d, _)| d.account).collect();
        let slots = self.accounts.fetch_many(&keys).await?;
        if slots.len() != keys.len() {
            warn!(
                requested = keys.len(),
                returned = slots.len(),
                "account provider broke slot contract"
            );
            return Err(Error::Provider {
                reason: format!(
                    "requested {} accounts, provider returned {} slots",
                    keys.len(),
                    slots.len()
                ),
            });
        }

        let mut resolved = Vec::with_capacity(known.len());
        // slots are in request order, so index i belongs to known[i]
        for ((descriptor, metadata), slot) in known.into_iter().zip(slots) {
            let Some(data) = slot else {
                debug!(
                    reserve = %descriptor.name,
                    account = %pubkey_to_string(&descriptor.account),
                    "reserve account not found"
                );
                continue;
            };
            match resolve_reserve(&self.config, descriptor, &metadata, &data) {
                Ok(reserve) => resolved.push(reserve),
                Err(err) => {
                    debug!(reserve = %descriptor.name, error = %err, "skipping reserve");
                }
            }
        }

        info!(
            protocol = %self.config.protocol,
            resolved = resolved.len(),
            skipped = self.descriptors.len() - resolved.len(),
            "reserves aggregated"
        );
        Ok(resolved)
    }

    pub async fn fetch(&self) -> Result<LendingReport, Error> {
        let reserves = self.resolve_reserves().await?;
        Ok(LendingReport {
            protocol: self.config.protocol.clone(),
            lending: reserves.iter().map(ResolvedReserve::to_record).collect(),
        })
    }
}

/// Decode, rescale and rate a single reserve account.
pub fn resolve_reserve(
    config: &AggregatorConfig,
    descriptor: &ReserveDescriptor,
    metadata: &TokenMetadata,
    data: &[u8],
) -> Result<ResolvedReserve, Error> {
    let layout = ReserveLayout::decode_with(data, config.trailing_bytes)?;
    let amounts = ReserveAmounts::from_liquidity(&layout.liquidity, metadata.decimals)?;
    let rates = ReserveRates::for_amounts(&amounts, &config.curve_for(&descriptor.name))?;

    Ok(ResolvedReserve {
        name: descriptor.name.clone(),
        symbol: metadata.symbol.clone(),
        mint: descriptor.mint,
        available_amount: amounts.available,
        utilized_amount: amounts.utilized,
        tvl: amounts.tvl()?,
        utilization: amounts.utilization,
        tvl_utilization: amounts.reported_utilization()?,
        borrow_apr: rates.borrow_apr,
        borrow_apy: rates.borrow_apy,
        lend_apy: rates.lend_apy,
    })
}
