use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

use super::domain::{ListingQuery, PropertyListing, Provenance};
use super::provider::ListingProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The provider failed and contributed nothing.
    Unavailable,
    /// The provider answered with fallback sample data.
    SampleData,
    /// The provider is configured but could not be set up.
    Misconfigured,
}

/// Non-blocking warning shown alongside the listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderNotice {
    pub provider: &'static str,
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedListings {
    pub listings: Vec<PropertyListing>,
    pub notices: Vec<ProviderNotice>,
}

/// Fans a query out to every enabled provider and concatenates the results in
/// provider order. No de-duplication across providers.
#[derive(Default, Clone)]
pub struct ListingAggregator {
    providers: Vec<Arc<dyn ListingProvider>>,
    notices: Vec<ProviderNotice>,
}

impl std::fmt::Debug for ListingAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ListingAggregator")
            .field("providers", &names)
            .field("notices", &self.notices)
            .finish()
    }
}

impl ListingAggregator {
    pub fn new(providers: Vec<Arc<dyn ListingProvider>>) -> Self {
        Self {
            providers,
            notices: Vec::new(),
        }
    }

    pub fn push(&mut self, provider: Arc<dyn ListingProvider>) {
        self.providers.push(provider);
    }

    /// Records a setup problem to be reported with every aggregation.
    pub fn note(&mut self, notice: ProviderNotice) {
        self.notices.push(notice);
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Waits for every provider; a failing one contributes an empty list and a notice.
    pub async fn aggregate(&self, query: &ListingQuery) -> AggregatedListings {
        let results = join_all(
            self.providers
                .iter()
                .map(|provider| provider.fetch(query)),
        )
        .await;

        let mut aggregated = AggregatedListings {
            listings: Vec::new(),
            notices: self.notices.clone(),
        };

        for (provider, result) in self.providers.iter().zip(results) {
            match result {
                Ok(listings) => {
                    let is_sample = !listings.is_empty()
                        && listings
                            .iter()
                            .all(|listing| listing.provenance == Provenance::Sample);
                    if is_sample {
                        aggregated.notices.push(ProviderNotice {
                            provider: provider.name(),
                            kind: NoticeKind::SampleData,
                            message: "Live listings are unavailable; showing sample properties."
                                .to_string(),
                        });
                    }
                    aggregated.listings.extend(listings);
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "listing provider failed");
                    aggregated.notices.push(ProviderNotice {
                        provider: provider.name(),
                        kind: NoticeKind::Unavailable,
                        message: format!("Could not load listings: {err}"),
                    });
                }
            }
        }

        aggregated
    }
}
