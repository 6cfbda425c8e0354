use async_trait::async_trait;

use super::domain::{ListingQuery, PropertyListing};
use crate::record_store::RecordStoreError;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    RecordStore(#[from] RecordStoreError),
    #[error("mls feed unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mls feed returned an unreadable body: {0}")]
    Decode(String),
    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
}

/// One source of property listings.
#[async_trait]
pub trait ListingProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, query: &ListingQuery) -> Result<Vec<PropertyListing>, ProviderError>;
}
