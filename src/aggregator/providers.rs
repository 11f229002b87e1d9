use std::collections::HashMap;

use async_trait::async_trait;
use solana_pubkey::Pubkey;

use crate::error::Error;
use crate::types::TokenMetadata;

/// Batched raw account reads.
///
/// Implementations return exactly one slot per requested account, in request
/// order, `None` for accounts that do not exist. `Err` means the whole batch
/// could not be served.
#[async_trait]
pub trait AccountDataProvider: Send + Sync {
    async fn fetch_many(&self, accounts: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, Error>;
}

/// Mint → symbol/decimals resolution. `Ok(None)` means the mint is unknown;
/// `Err` means the lookup service itself failed.
#[async_trait]
pub trait TokenMetadataLookup: Send + Sync {
    async fn resolve(&self, mint: &Pubkey) -> Result<Option<TokenMetadata>, Error>;
}

/// Account snapshot held in memory, e.g. replayed from a capture.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccounts {
    accounts: HashMap<Pubkey, Vec<u8>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, account: Pubkey, data: Vec<u8>) {
        self.accounts.insert(account, data);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl FromIterator<(Pubkey, Vec<u8>)> for InMemoryAccounts {
    fn from_iter<I: IntoIterator<Item = (Pubkey, Vec<u8>)>>(iter: I) -> Self {
        Self {
            accounts: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AccountDataProvider for InMemoryAccounts {
    async fn fetch_many(&self, accounts: &[Pubkey]) -> Result<Vec<Option<Vec<u8>>>, Error> {
        Ok(accounts
            .iter()
            .map(|key| self.accounts.get(key).cloned())
            .collect())
    }
}

/// Fixed mint → metadata table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenMetadata {
    tokens: HashMap<Pubkey, TokenMetadata>,
}

impl FromIterator<(Pubkey, TokenMetadata)> for StaticTokenMetadata {
    fn from_iter<I: IntoIterator<Item = (Pubkey, TokenMetadata)>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl TokenMetadataLookup for StaticTokenMetadata {
    async fn resolve(&self, mint: &Pubkey) -> Result<Option<TokenMetadata>, Error> {
        Ok(self.tokens.get(mint).cloned())
    }
}
