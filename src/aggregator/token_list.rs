//! Token metadata backed by an SPL token-list document.
//!
//! The list is loaded at most once per cache. Concurrent first callers share
//! a single in-flight fetch; later callers read the cached list. The
//! process-wide cache lives behind [`global_cache`] and can be cleared with
//! [`reset_global_cache`].

use std::sync::{Arc, LazyLock, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use solana_pubkey::Pubkey;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::aggregator::providers::TokenMetadataLookup;
use crate::config::pubkey_to_string;
use crate::error::Error;
use crate::types::TokenMetadata;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Cluster {
    #[default]
    MainnetBeta,
    Testnet,
    Devnet,
}

impl Cluster {
    /// Chain id used by the SPL token list for this cluster.
    pub fn chain_id(self) -> u64 {
        match self {
            Self::MainnetBeta => 101,
            Self::Testnet => 102,
            Self::Devnet => 103,
        }
    }
}

/// One entry of an SPL token list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub chain_id: u64,
    /// Base58 mint address.
    pub address: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub decimals: u8,
}

#[derive(Deserialize)]
struct TokenListDocument {
    tokens: Vec<TokenInfo>,
}

/// Parse `{"tokens": [..]}` or a bare array of tokens.
pub fn parse_token_list(json: &str) -> Result<Vec<TokenInfo>, Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }
    let doc: TokenListDocument = serde_json::from_value(value)?;
    Ok(doc.tokens)
}

/// Where the full token list comes from.
#[async_trait]
pub trait TokenListSource: Send + Sync {
    async fn fetch_token_list(&self) -> Result<Vec<TokenInfo>, Error>;
}

#[async_trait]
impl<T: TokenListSource + ?Sized> TokenListSource for &T {
    async fn fetch_token_list(&self) -> Result<Vec<TokenInfo>, Error> {
        (**self).fetch_token_list().await
    }
}

/// A token list bundled with the caller, parsed on fetch.
pub struct StaticTokenList {
    json: String,
}

impl StaticTokenList {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

#[async_trait]
impl TokenListSource for StaticTokenList {
    async fn fetch_token_list(&self) -> Result<Vec<TokenInfo>, Error> {
        parse_token_list(&self.json).map_err(|e| Error::TokenList {
            reason: e.to_string(),
        })
    }
}

type TokenSlot = Arc<OnceCell<Arc<[TokenInfo]>>>;

/// Lazily populated, resettable token list.
pub struct TokenListCache {
    slot: RwLock<TokenSlot>,
}

impl Default for TokenListCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenListCache {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Cached list, fetching it from `source` on first use. A failed fetch
    /// leaves the cache empty so the next caller retries.
    pub async fn get_or_fetch<S>(&self, source: &S) -> Result<Arc<[TokenInfo]>, Error>
    where
        S: TokenListSource + ?Sized,
    {
        let slot = self.current();
        let tokens = slot
            .get_or_try_init(|| async {
                let tokens = source.fetch_token_list().await?;
                info!(count = tokens.len(), "token list loaded");
                Ok::<_, Error>(Arc::from(tokens))
            })
            .await?;
        Ok(Arc::clone(tokens))
    }

    pub fn is_loaded(&self) -> bool {
        self.current().initialized()
    }

    /// Drop the cached list. Fetches already in flight finish against the
    /// old slot and do not repopulate the new one.
    pub fn reset(&self) {
        let fresh = Arc::new(OnceCell::new());
        match self.slot.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }

    fn current(&self) -> TokenSlot {
        match self.slot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

static GLOBAL_TOKEN_LIST: LazyLock<Arc<TokenListCache>> =
    LazyLock::new(|| Arc::new(TokenListCache::new()));

/// Process-wide token list cache, initialised on first use.
pub fn global_cache() -> Arc<TokenListCache> {
    Arc::clone(&GLOBAL_TOKEN_LIST)
}

pub fn reset_global_cache() {
    GLOBAL_TOKEN_LIST.reset();
}

/// [`TokenMetadataLookup`] over a cached token list, restricted to one cluster.
pub struct TokenRegistry<S> {
    source: S,
    cache: Arc<TokenListCache>,
    cluster: Cluster,
}

impl<S: TokenListSource> TokenRegistry<S> {
    /// Registry sharing the process-wide cache.
    ///
    /// The cache holds whichever list was fetched first. Registries built
    /// later with a different `source` read that list, and their own source
    /// is only consulted after [`reset_global_cache`]. Use [`Self::with_cache`]
    /// to give a source its own cache.
    pub fn new(source: S, cluster: Cluster) -> Self {
        Self::with_cache(source, cluster, global_cache())
    }

    pub fn with_cache(source: S, cluster: Cluster, cache: Arc<TokenListCache>) -> Self {
        Self {
            source,
            cache,
            cluster,
        }
    }

    pub async fn find_by_mint(&self, mint: &Pubkey) -> Result<Option<TokenInfo>, Error> {
        let tokens = self.cache.get_or_fetch(&self.source).await?;
        let address = pubkey_to_string(mint);
        let chain_id = self.cluster.chain_id();
        let found = tokens
            .iter()
            .find(|t| t.chain_id == chain_id && t.address == address)
            .cloned();
        if found.is_none() {
            debug!(mint = %address, cluster = %self.cluster, "mint not in token list");
        }
        Ok(found)
    }
}

#[async_trait]
impl<S: TokenListSource> TokenMetadataLookup for TokenRegistry<S> {
    async fn resolve(&self, mint: &Pubkey) -> Result<Option<TokenMetadata>, Error> {
        Ok(self
            .find_by_mint(mint)
            .await?
            .map(|token| TokenMetadata {
                symbol: token.symbol,
                decimals: token.decimals,
            }))
    }
}
