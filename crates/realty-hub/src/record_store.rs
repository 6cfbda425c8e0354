//! Client for the primary record store, a spreadsheet-style REST database holding
//! property, agent and tenant-configuration tables.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;
use url::Url;

/// Upper bound on followed pagination offsets for a single listing call.
const MAX_PAGES: usize = 20;

pub const PROPERTIES_TABLE: &str = "Properties";
pub const AGENTS_TABLE: &str = "Agents";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<StoreRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("record store unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("record store rejected the request ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("record store url '{0}' cannot hold a base path")]
    InvalidRoot(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl RecordStoreError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == 401 || *status == 403)
    }
}

#[derive(Clone)]
pub struct RecordStoreClient {
    http: reqwest::Client,
    api_root: Url,
    api_key: String,
    base_id: String,
}

impl std::fmt::Debug for RecordStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStoreClient")
            .field("api_root", &self.api_root.as_str())
            .field("base_id", &self.base_id)
            .finish_non_exhaustive()
    }
}

impl RecordStoreClient {
    pub fn new(
        http: reqwest::Client,
        api_root: &str,
        api_key: impl Into<String>,
        base_id: impl Into<String>,
    ) -> Result<Self, RecordStoreError> {
        let api_root = Url::parse(api_root)?;
        if api_root.cannot_be_a_base() {
            return Err(RecordStoreError::InvalidRoot(api_root.to_string()));
        }

        Ok(Self {
            http,
            api_root,
            api_key: api_key.into(),
            base_id: base_id.into(),
        })
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    fn table_url(&self, table: &str, record_id: Option<&str>) -> Result<Url, RecordStoreError> {
        let mut url = self.api_root.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RecordStoreError::InvalidRoot(self.api_root.to_string()))?;
            segments.pop_if_empty().push(&self.base_id).push(table);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    /// All records of `table`, optionally restricted by a filter formula.
    pub async fn list(
        &self,
        table: &str,
        formula: Option<&str>,
    ) -> Result<Vec<StoreRecord>, RecordStoreError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut url = self.table_url(table, None)?;
            {
                let mut query = url.query_pairs_mut();
                if let Some(formula) = formula {
                    query.append_pair("filterByFormula", formula);
                }
                if let Some(offset) = offset.as_deref() {
                    query.append_pair("offset", offset);
                }
            }

            let response = self
                .http
                .get(url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            let page: RecordPage = read_json(response).await?;
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!(table, count = records.len(), "record store listing fetched");
        Ok(records)
    }

    pub async fn create(
        &self,
        table: &str,
        fields: Map<String, Value>,
    ) -> Result<StoreRecord, RecordStoreError> {
        let url = self.table_url(table, None)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields, "typecast": true }))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn update(
        &self,
        table: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<StoreRecord, RecordStoreError> {
        let url = self.table_url(table, Some(record_id))?;
        let response = self
            .http
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": fields, "typecast": true }))
            .send()
            .await?;
        read_json(response).await
    }

    /// Cheap read proving the credentials can reach `table`.
    pub async fn verify(&self, table: &str) -> Result<(), RecordStoreError> {
        let mut url = self.table_url(table, None)?;
        url.query_pairs_mut().append_pair("maxRecords", "1");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let _: RecordPage = read_json(response).await?;
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, RecordStoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RecordStoreError::Status {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let from_body = parsed.as_ref().and_then(|value| match value.get("error") {
        Some(Value::String(code)) => Some(code.clone()),
        Some(Value::Object(detail)) => detail
            .get("message")
            .or_else(|| detail.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    });

    from_body.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected response")
            .to_string()
    })
}

/// `{Field} = 'value'` with quotes and backslashes escaped.
pub fn equals_formula(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{{{field}}} = '{escaped}'")
}

/// Text form of a scalar cell; arrays and objects have none.
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RecordStoreClient {
        RecordStoreClient::new(reqwest::Client::new(), &server.uri(), "pat-key", "appBase")
            .expect("client builds")
    }

    #[test]
    fn formula_escapes_quotes() {
        assert_eq!(equals_formula("Agent", "Dana"), "{Agent} = 'Dana'");
        assert_eq!(
            equals_formula("Agent", "Pat O'Neil"),
            "{Agent} = 'Pat O\\'Neil'"
        );
    }

    #[test]
    fn scalar_cells_become_text() {
        assert_eq!(value_as_text(&json!("x")), Some("x".to_string()));
        assert_eq!(value_as_text(&json!(42)), Some("42".to_string()));
        assert_eq!(value_as_text(&json!(true)), Some("true".to_string()));
        assert_eq!(value_as_text(&json!([1])), None);
    }

    #[tokio::test]
    async fn list_follows_offsets_and_sends_formula() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/appBase/Properties"))
            .and(header("authorization", "Bearer pat-key"))
            .and(query_param("offset", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "id": "rec2", "fields": { "Address": "2 Elm" } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/appBase/Properties"))
            .and(query_param("filterByFormula", "{Agent} = 'Dana'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "id": "rec1", "fields": { "Address": "1 Oak" } }],
                "offset": "page2"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let records = client(&server)
            .list("Properties", Some("{Agent} = 'Dana'"))
            .await
            .expect("listing succeeds");

        let ids: Vec<_> = records.iter().map(|record| record.id.as_str()).collect();
        assert_eq!(ids, vec!["rec1", "rec2"]);
    }

    #[tokio::test]
    async fn verify_surfaces_store_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/appBase/Properties"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "type": "AUTHENTICATION_REQUIRED", "message": "Invalid API key" }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .verify("Properties")
            .await
            .expect_err("401 rejected");
        assert!(err.is_auth());
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn update_patches_record_path() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/appBase/Tenants/rec9"))
            .and(body_partial_json(json!({ "fields": { "Agent Name": "Dana" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "rec9", "fields": { "Agent Name": "Dana" }
            })))
            .mount(&server)
            .await;

        let mut fields = Map::new();
        fields.insert("Agent Name".to_string(), json!("Dana"));
        let record = client(&server)
            .update("Tenants", "rec9", fields)
            .await
            .expect("update succeeds");
        assert_eq!(record.id, "rec9");
    }
}
