use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::domain::{ListingQuery, PropertyListing, Provenance};
use super::fallback::FallbackPolicy;
use super::normalize::{map_record, MLS_FIELDS};
use super::provider::{ListingProvider, ProviderError};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const OUTPUT_TYPE_HEADER: &str = "x-output-type";
pub const API_VERSION_HEADER: &str = "x-api-version";
pub const PARTNER_KEY_HEADER: &str = "x-partner-key";

/// Broker credentials for the MLS feed. Optional parts that are `None` (or blank)
/// are left off the request entirely.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MlsCredentials {
    pub api_key: String,
    pub output_type: Option<String>,
    pub api_version: Option<String>,
    pub partner_key: Option<String>,
}

impl std::fmt::Debug for MlsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlsCredentials")
            .field("output_type", &self.output_type)
            .field("api_version", &self.api_version)
            .field("partner_key", &self.partner_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl MlsCredentials {
    fn optional_headers(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (OUTPUT_TYPE_HEADER, self.output_type.as_deref()),
            (API_VERSION_HEADER, self.api_version.as_deref()),
            (PARTNER_KEY_HEADER, self.partner_key.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| (name, value))
        })
    }
}

/// Supplemental listings from the MLS syndication feed.
#[derive(Debug, Clone)]
pub struct MlsProvider {
    http: reqwest::Client,
    endpoint: Url,
    credentials: MlsCredentials,
    fallback: Arc<dyn FallbackPolicy>,
}

impl MlsProvider {
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        credentials: MlsCredentials,
        fallback: Arc<dyn FallbackPolicy>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http,
            endpoint: Url::parse(endpoint)?,
            credentials,
            fallback,
        })
    }
}

/// Listings from a feed body: an object keyed by opaque listing ids, or a bare array.
pub fn parse_feed(body: &Value) -> Result<Vec<PropertyListing>, ProviderError> {
    match body {
        Value::Object(entries) => Ok(entries
            .iter()
            .filter_map(|(key, record)| {
                record
                    .as_object()
                    .map(|fields| map_record(key, fields, &MLS_FIELDS, Provenance::Syndicated))
            })
            .collect()),
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.as_object().map(|fields| {
                    map_record(
                        &format!("mls-{index}"),
                        fields,
                        &MLS_FIELDS,
                        Provenance::Syndicated,
                    )
                })
            })
            .collect()),
        other => Err(ProviderError::Decode(format!(
            "expected an object or array of listings, got {}",
            kind_of(other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl ListingProvider for MlsProvider {
    fn name(&self) -> &'static str {
        "mls"
    }

    async fn fetch(&self, _query: &ListingQuery) -> Result<Vec<PropertyListing>, ProviderError> {
        let mut request = self
            .http
            .get(self.endpoint.clone())
            .header(API_KEY_HEADER, self.credentials.api_key.as_str());
        for (name, value) in self.credentials.optional_headers() {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "mls feed refused the request, using fallback listings");
            return Ok(self.fallback.on_failure(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| ProviderError::Decode(err.to_string()))?;
        let listings = parse_feed(&body)?;
        debug!(count = listings.len(), "mls listings fetched");
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::fallback::{EmptyFallback, SampleListings};
    use serde_json::json;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn provider(server: &MockServer, credentials: MlsCredentials) -> MlsProvider {
        MlsProvider::new(
            reqwest::Client::new(),
            &format!("{}/listings", server.uri()),
            credentials,
            Arc::new(SampleListings),
        )
        .expect("provider builds")
    }

    #[tokio::test]
    async fn sends_key_and_only_present_optional_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header(API_KEY_HEADER, "mls-key"))
            .and(header(API_VERSION_HEADER, "2"))
            .respond_with(|request: &Request| {
                let leaked = request.headers.contains_key(OUTPUT_TYPE_HEADER)
                    || request.headers.contains_key(PARTNER_KEY_HEADER);
                if leaked {
                    ResponseTemplate::new(400)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({
                        "a1": { "mlsId": "a1", "listPrice": 300000, "address": { "city": "Reno" } }
                    }))
                }
            })
            .mount(&server)
            .await;

        let credentials = MlsCredentials {
            api_key: "mls-key".to_string(),
            output_type: Some("  ".to_string()),
            api_version: Some("2".to_string()),
            partner_key: None,
        };
        let listings = provider(&server, credentials)
            .fetch(&ListingQuery::default())
            .await
            .expect("fetch succeeds");

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].city, "Reno");
        assert_eq!(listings[0].provenance, Provenance::Syndicated);
    }

    #[tokio::test]
    async fn non_success_status_yields_tagged_samples() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let credentials = MlsCredentials {
            api_key: "mls-key".to_string(),
            ..MlsCredentials::default()
        };
        let listings = provider(&server, credentials)
            .fetch(&ListingQuery::default())
            .await
            .expect("fallback never errors");

        assert_eq!(listings, crate::listings::fallback::sample_listings());
        assert!(listings
            .iter()
            .all(|listing| listing.provenance == Provenance::Sample));
    }

    #[tokio::test]
    async fn no_fallback_policy_returns_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = MlsProvider::new(
            reqwest::Client::new(),
            &server.uri(),
            MlsCredentials {
                api_key: "bad".to_string(),
                ..MlsCredentials::default()
            },
            Arc::new(EmptyFallback),
        )
        .expect("provider builds");

        let listings = provider
            .fetch(&ListingQuery::default())
            .await
            .expect("fallback never errors");
        assert!(listings.is_empty());
    }

    #[test]
    fn feed_accepts_arrays_and_rejects_scalars() {
        let listings = parse_feed(&json!([{ "UnparsedAddress": "1 Main" }, "junk"]))
            .expect("array parses");
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "mls-0");

        assert!(matches!(
            parse_feed(&json!("nope")),
            Err(ProviderError::Decode(_))
        ));
    }
}
