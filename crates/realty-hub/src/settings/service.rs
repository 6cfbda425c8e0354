use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::keys::{SettingKey, SettingsSnapshot, UnknownSetting};
use super::query::QueryParams;
use super::resolver::{ConfigResolver, IngestReport, ResolveContext, WriteOutcome};
use crate::record_store::{value_as_text, RecordStoreClient, PROPERTIES_TABLE};

/// Body of a settings upsert: either `{ "tenant_id": .., "settings": {..} }` or a flat
/// object of canonical names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SettingsPayload {
    Scoped {
        #[serde(default)]
        tenant_id: Option<String>,
        settings: BTreeMap<String, Value>,
    },
    Flat(BTreeMap<String, Value>),
}

impl SettingsPayload {
    fn into_parts(self) -> (Option<String>, BTreeMap<String, Value>) {
        match self {
            SettingsPayload::Scoped {
                tenant_id,
                settings,
            } => (tenant_id, settings),
            SettingsPayload::Flat(settings) => (None, settings),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReceipt {
    pub updated: Vec<SettingKey>,
    pub outcome: WriteOutcome,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsServiceError {
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    UnknownSetting(#[from] UnknownSetting),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("setting '{0}' must be a string, number or boolean")]
    InvalidValue(String),
    #[error("record store connection failed: {0}")]
    InvalidCredentials(String),
    #[error("invalid deployment url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Admin surface over the resolver: key-checked reads and writes, credential checks
/// and deployment-URL ingestion.
pub struct SettingsService {
    resolver: Arc<ConfigResolver>,
    admin_key: Option<String>,
    http: reqwest::Client,
    record_store_url: String,
}

impl std::fmt::Debug for SettingsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsService")
            .field("resolver", &self.resolver)
            .field("admin_key_set", &self.admin_key.is_some())
            .field("record_store_url", &self.record_store_url)
            .finish()
    }
}

impl SettingsService {
    pub fn new(
        resolver: Arc<ConfigResolver>,
        admin_key: Option<String>,
        http: reqwest::Client,
        record_store_url: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            admin_key: admin_key.filter(|key| !key.is_empty()),
            http,
            record_store_url: record_store_url.into(),
        }
    }

    /// Exact comparison against the configured key; no key configured means no access.
    pub fn authorize(&self, presented: Option<&str>) -> Result<(), SettingsServiceError> {
        match (self.admin_key.as_deref(), presented) {
            (Some(expected), Some(presented)) if expected == presented => Ok(()),
            _ => Err(SettingsServiceError::Unauthorized),
        }
    }

    pub async fn snapshot(
        &self,
        api_key: Option<&str>,
        tenant: Option<String>,
    ) -> Result<SettingsSnapshot, SettingsServiceError> {
        self.authorize(api_key)?;
        let ctx = ResolveContext {
            tenant,
            ..ResolveContext::default()
        };
        Ok(self.resolver.snapshot(&ctx).await)
    }

    /// Validates the whole payload before writing anything.
    pub async fn update(
        &self,
        api_key: Option<&str>,
        payload: SettingsPayload,
    ) -> Result<UpdateReceipt, SettingsServiceError> {
        self.authorize(api_key)?;

        let (tenant, raw) = payload.into_parts();
        let mut values = BTreeMap::new();
        for (name, value) in raw {
            let key: SettingKey = name.parse()?;
            let text = value_as_text(&value)
                .or_else(|| value.is_null().then(String::new))
                .ok_or_else(|| SettingsServiceError::InvalidValue(name.clone()))?;
            values.insert(key, text);
        }

        let tenant = tenant.or_else(|| values.get(&SettingKey::TenantId).cloned());
        let outcome = self.resolver.set_many(&values, tenant.as_deref()).await;
        let updated: Vec<SettingKey> = values.into_keys().collect();
        info!(count = updated.len(), remote = outcome.label(), "settings updated via api");

        Ok(UpdateReceipt { updated, outcome })
    }

    /// Persists record-store credentials, then verifies them. A failed check is reported
    /// but the values stay saved so the operator's input is not lost.
    pub async fn save_record_store_credentials(
        &self,
        api_key: Option<&str>,
        store_api_key: &str,
        base_id: &str,
        tenant: Option<String>,
    ) -> Result<UpdateReceipt, SettingsServiceError> {
        self.authorize(api_key)?;

        let mut values = BTreeMap::new();
        values.insert(SettingKey::AirtableApiKey, store_api_key.trim().to_string());
        values.insert(SettingKey::AirtableBaseId, base_id.trim().to_string());
        let outcome = self.resolver.set_many(&values, tenant.as_deref()).await;

        if store_api_key.trim().is_empty() || base_id.trim().is_empty() {
            return Err(SettingsServiceError::InvalidCredentials(
                "both an API key and a base id are required".to_string(),
            ));
        }

        let client = RecordStoreClient::new(
            self.http.clone(),
            &self.record_store_url,
            store_api_key.trim(),
            base_id.trim(),
        )
        .map_err(|err| SettingsServiceError::InvalidCredentials(err.to_string()))?;

        if let Err(err) = client.verify(PROPERTIES_TABLE).await {
            warn!(base = client.base_id(), error = %err, "record store credentials rejected");
            let message = if err.is_auth() {
                format!("the record store rejected the API key ({err})")
            } else {
                err.to_string()
            };
            return Err(SettingsServiceError::InvalidCredentials(message));
        }

        Ok(UpdateReceipt {
            updated: values.into_keys().collect(),
            outcome,
        })
    }

    pub async fn ingest_url(
        &self,
        api_key: Option<&str>,
        url: &str,
    ) -> Result<IngestReport, SettingsServiceError> {
        self.authorize(api_key)?;
        let params = QueryParams::from_url(url)?;
        let report = self.resolver.ingest(&params).await;
        info!(count = report.absorbed.len(), "deployment url ingested");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::store::MemorySettingsStore;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(record_store_url: &str) -> SettingsService {
        let resolver = Arc::new(ConfigResolver::new(Arc::new(MemorySettingsStore::default())));
        SettingsService::new(
            resolver,
            Some("secret".to_string()),
            reqwest::Client::new(),
            record_store_url,
        )
    }

    #[test]
    fn authorization_is_exact() {
        let service = service("http://localhost");
        assert!(service.authorize(Some("secret")).is_ok());
        assert!(service.authorize(Some("Secret")).is_err());
        assert!(service.authorize(Some("secret ")).is_err());
        assert!(service.authorize(None).is_err());
    }

    #[test]
    fn missing_admin_key_locks_the_surface() {
        let resolver = Arc::new(ConfigResolver::new(Arc::new(MemorySettingsStore::default())));
        let service = SettingsService::new(
            resolver,
            Some(String::new()),
            reqwest::Client::new(),
            "http://localhost",
        );
        assert!(matches!(
            service.authorize(Some("")),
            Err(SettingsServiceError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn update_rejects_unknown_keys_without_writing() {
        let service = service("http://localhost");
        let payload: SettingsPayload = serde_json::from_value(json!({
            "agent_name": "Dana",
            "favorite_color": "teal"
        }))
        .expect("payload parses");

        let err = service
            .update(Some("secret"), payload)
            .await
            .expect_err("unknown key rejected");
        assert!(matches!(err, SettingsServiceError::UnknownSetting(_)));

        let snapshot = service.snapshot(Some("secret"), None).await.expect("authorized");
        assert_eq!(snapshot.get(SettingKey::AgentName), "");
    }

    #[tokio::test]
    async fn update_accepts_scoped_payload_with_scalars() {
        let service = service("http://localhost");
        let payload: SettingsPayload = serde_json::from_value(json!({
            "settings": { "admin_mode": true, "agentName": "Dana" }
        }))
        .expect("payload parses");

        let receipt = service.update(Some("secret"), payload).await.expect("stored");
        assert_eq!(
            receipt.updated,
            vec![SettingKey::AgentName, SettingKey::AdminMode]
        );
        assert_eq!(receipt.outcome, WriteOutcome::Local);

        let snapshot = service.snapshot(Some("secret"), None).await.expect("authorized");
        assert!(snapshot.flag(SettingKey::AdminMode));
    }

    #[tokio::test]
    async fn rejected_credentials_are_still_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/appBad/Properties"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "NOT_FOUND"
            })))
            .mount(&server)
            .await;

        let service = service(&server.uri());
        let err = service
            .save_record_store_credentials(Some("secret"), "pat-1", "appBad", None)
            .await
            .expect_err("verification fails");
        assert!(matches!(err, SettingsServiceError::InvalidCredentials(ref message) if message.contains("NOT_FOUND")));

        let snapshot = service.snapshot(Some("secret"), None).await.expect("authorized");
        assert_eq!(snapshot.get(SettingKey::AirtableApiKey), "pat-1");
        assert_eq!(snapshot.get(SettingKey::AirtableBaseId), "appBad");
    }

    #[tokio::test]
    async fn accepted_credentials_report_both_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/appGood/Properties"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "records": [] })))
            .mount(&server)
            .await;

        let receipt = service(&server.uri())
            .save_record_store_credentials(Some("secret"), "pat-1", "appGood", None)
            .await
            .expect("verification passes");
        assert_eq!(
            receipt.updated,
            vec![SettingKey::AirtableApiKey, SettingKey::AirtableBaseId]
        );
    }

    #[tokio::test]
    async fn ingest_rejects_malformed_url() {
        let err = service("http://localhost")
            .ingest_url(Some("secret"), "::not a url::")
            .await
            .expect_err("bad url");
        assert!(matches!(err, SettingsServiceError::InvalidUrl(_)));
    }
}
