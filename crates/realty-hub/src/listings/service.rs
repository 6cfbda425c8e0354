use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::aggregator::{AggregatedListings, ListingAggregator, NoticeKind, ProviderNotice};
use super::domain::{ListingQuery, PropertyListing};
use super::fallback::FallbackPolicy;
use super::filter::{property_types, ListingFilter};
use super::mls::{MlsCredentials, MlsProvider};
use super::store_provider::RecordStoreProvider;
use crate::config::ProviderEndpoints;
use crate::record_store::RecordStoreClient;
use crate::settings::{ConfigResolver, ResolveContext, SettingKey, SettingsSnapshot};

/// Filtered listings plus what the page needs around them.
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage {
    pub listings: Vec<PropertyListing>,
    pub notices: Vec<ProviderNotice>,
    pub property_types: Vec<String>,
    /// Count before client-side filtering.
    pub total: usize,
}

/// Builds providers from freshly resolved settings on every call; nothing is cached
/// between requests.
pub struct ListingService {
    resolver: Arc<ConfigResolver>,
    endpoints: ProviderEndpoints,
    http: reqwest::Client,
    fallback: Arc<dyn FallbackPolicy>,
}

impl std::fmt::Debug for ListingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingService")
            .field("endpoints", &self.endpoints)
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

fn optional(snapshot: &SettingsSnapshot, key: SettingKey) -> Option<String> {
    snapshot.value(key).map(str::to_string)
}

impl ListingService {
    pub fn new(
        resolver: Arc<ConfigResolver>,
        endpoints: ProviderEndpoints,
        http: reqwest::Client,
        fallback: Arc<dyn FallbackPolicy>,
    ) -> Self {
        Self {
            resolver,
            endpoints,
            http,
            fallback,
        }
    }

    /// Providers enabled by `snapshot`: the record store when both its credentials are
    /// set, the MLS feed when its key is set.
    pub fn aggregator_for(&self, snapshot: &SettingsSnapshot) -> ListingAggregator {
        let mut aggregator = ListingAggregator::default();

        if let (Some(api_key), Some(base_id)) = (
            snapshot.value(SettingKey::AirtableApiKey),
            snapshot.value(SettingKey::AirtableBaseId),
        ) {
            match RecordStoreClient::new(
                self.http.clone(),
                &self.endpoints.record_store_url,
                api_key,
                base_id,
            ) {
                Ok(client) => aggregator.push(Arc::new(RecordStoreProvider::new(client))),
                Err(err) => {
                    warn!(error = %err, "record store provider disabled");
                    aggregator.note(ProviderNotice {
                        provider: "record_store",
                        kind: NoticeKind::Misconfigured,
                        message: err.to_string(),
                    });
                }
            }
        }

        if let Some(api_key) = snapshot.value(SettingKey::MlsApiKey) {
            let credentials = MlsCredentials {
                api_key: api_key.to_string(),
                output_type: optional(snapshot, SettingKey::MlsOutputType),
                api_version: optional(snapshot, SettingKey::MlsApiVersion),
                partner_key: optional(snapshot, SettingKey::MlsPartnerKey),
            };
            match MlsProvider::new(
                self.http.clone(),
                &self.endpoints.mls_url,
                credentials,
                self.fallback.clone(),
            ) {
                Ok(provider) => aggregator.push(Arc::new(provider)),
                Err(err) => {
                    warn!(error = %err, "mls provider disabled");
                    aggregator.note(ProviderNotice {
                        provider: "mls",
                        kind: NoticeKind::Misconfigured,
                        message: err.to_string(),
                    });
                }
            }
        }

        aggregator
    }

    /// Every listing from the enabled providers. `agent` overrides the configured
    /// agent selector.
    pub async fn aggregate(
        &self,
        ctx: &ResolveContext,
        agent: Option<String>,
    ) -> AggregatedListings {
        let snapshot = self.resolver.snapshot(ctx).await;
        let query = ListingQuery {
            agent: agent
                .filter(|value| !value.trim().is_empty())
                .or_else(|| optional(&snapshot, SettingKey::AgentFilter)),
        };

        let aggregator = self.aggregator_for(&snapshot);
        if aggregator.is_empty() {
            debug!("no listing provider configured");
        }
        debug!(providers = ?aggregator.provider_names(), agent = ?query.agent, "aggregating listings");
        aggregator.aggregate(&query).await
    }

    pub async fn search(
        &self,
        ctx: &ResolveContext,
        agent: Option<String>,
        filter: &ListingFilter,
    ) -> ListingPage {
        let AggregatedListings { listings, notices } = self.aggregate(ctx, agent).await;
        ListingPage {
            property_types: property_types(&listings),
            total: listings.len(),
            listings: filter.apply(&listings),
            notices,
        }
    }

    pub async fn find(&self, ctx: &ResolveContext, id: &str) -> Option<PropertyListing> {
        self.aggregate(ctx, None)
            .await
            .listings
            .into_iter()
            .find(|listing| listing.id == id)
    }
}
