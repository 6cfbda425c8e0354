//! Property listings: the shared display model, provider adapters, aggregation and
//! the client-side filters applied on top.

pub mod aggregator;
pub mod domain;
pub mod fallback;
pub mod filter;
pub mod mls;
pub mod normalize;
pub mod provider;
pub mod router;
pub mod service;
pub mod store_provider;

pub use aggregator::{AggregatedListings, ListingAggregator, NoticeKind, ProviderNotice};
pub use domain::{
    ListingQuery, PropertyListing, Provenance, PLACEHOLDER_IMAGE_URL, UNKNOWN_CITY,
};
pub use fallback::{sample_listings, EmptyFallback, FallbackPolicy, SampleListings};
pub use filter::{property_types, ListingFilter, ListingTab};
pub use mls::{MlsCredentials, MlsProvider};
pub use normalize::{map_record, FieldTable, MLS_FIELDS, RECORD_STORE_FIELDS};
pub use provider::{ListingProvider, ProviderError};
pub use router::{listing_router, request_context};
pub use service::{ListingPage, ListingService};
pub use store_provider::{agent_formula, RecordStoreProvider, ALL_AGENTS};
