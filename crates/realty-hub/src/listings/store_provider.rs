use async_trait::async_trait;
use tracing::debug;

use super::domain::{ListingQuery, PropertyListing, Provenance};
use super::normalize::{map_record, RECORD_STORE_FIELDS};
use super::provider::{ListingProvider, ProviderError};
use crate::record_store::{equals_formula, RecordStoreClient, PROPERTIES_TABLE};

/// Agent selector meaning "no restriction".
pub const ALL_AGENTS: &str = "all";
pub const AGENT_FIELD: &str = "Agent";

/// Filter formula for an agent selector; absent, blank and `all` mean unfiltered.
pub fn agent_formula(selector: Option<&str>) -> Option<String> {
    let selector = selector.map(str::trim).filter(|value| !value.is_empty())?;
    if selector.eq_ignore_ascii_case(ALL_AGENTS) {
        return None;
    }
    Some(equals_formula(AGENT_FIELD, selector))
}

/// Listings from the site's own record store.
#[derive(Debug, Clone)]
pub struct RecordStoreProvider {
    client: RecordStoreClient,
}

impl RecordStoreProvider {
    pub fn new(client: RecordStoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ListingProvider for RecordStoreProvider {
    fn name(&self) -> &'static str {
        "record_store"
    }

    async fn fetch(&self, query: &ListingQuery) -> Result<Vec<PropertyListing>, ProviderError> {
        let formula = agent_formula(query.agent.as_deref());
        let records = self.client.list(PROPERTIES_TABLE, formula.as_deref()).await?;
        debug!(count = records.len(), filtered = formula.is_some(), "record store listings fetched");

        Ok(records
            .iter()
            .map(|record| map_record(&record.id, &record.fields, &RECORD_STORE_FIELDS, Provenance::Local))
            .collect())
    }
}
