use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::keys::SettingKey;
use crate::record_store::{
    equals_formula, value_as_text, RecordStoreClient, RecordStoreError, StoreRecord,
};

/// Column identifying which tenant a configuration record belongs to.
pub const TENANT_ID_FIELD: &str = "Tenant ID";

/// One tenant's configuration as held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRecord {
    pub record_id: String,
    pub tenant_id: String,
    pub values: BTreeMap<SettingKey, String>,
}

impl TenantRecord {
    pub fn value(&self, key: SettingKey) -> Option<&str> {
        self.values
            .get(&key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TenantStoreError {
    #[error(transparent)]
    RecordStore(#[from] RecordStoreError),
    #[error("tenant store unavailable: {0}")]
    Unavailable(String),
}

/// Remote per-tenant configuration, one record per tenant id.
#[async_trait]
pub trait TenantConfigStore: Send + Sync {
    async fn fetch(&self, tenant_id: &str) -> Result<Option<TenantRecord>, TenantStoreError>;
    async fn create(
        &self,
        tenant_id: &str,
        values: &BTreeMap<SettingKey, String>,
    ) -> Result<TenantRecord, TenantStoreError>;
    async fn update(
        &self,
        record: &TenantRecord,
        values: &BTreeMap<SettingKey, String>,
    ) -> Result<TenantRecord, TenantStoreError>;
}

/// Tenant records kept in a table of the record store.
#[derive(Debug, Clone)]
pub struct RecordStoreTenantConfig {
    client: RecordStoreClient,
    table: String,
}

impl RecordStoreTenantConfig {
    pub fn new(client: RecordStoreClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn to_fields(values: &BTreeMap<SettingKey, String>) -> Map<String, Value> {
        values
            .iter()
            .filter_map(|(key, value)| {
                key.remote_field()
                    .map(|field| (field.to_string(), Value::String(value.clone())))
            })
            .collect()
    }

    fn from_record(record: StoreRecord, tenant_id: &str) -> TenantRecord {
        let values = SettingKey::all()
            .into_iter()
            .filter_map(|key| {
                let field = key.remote_field()?;
                let text = record.fields.get(field).and_then(value_as_text)?;
                Some((key, text))
            })
            .collect();

        let tenant_id = record
            .fields
            .get(TENANT_ID_FIELD)
            .and_then(value_as_text)
            .unwrap_or_else(|| tenant_id.to_string());

        TenantRecord {
            record_id: record.id,
            tenant_id,
            values,
        }
    }
}

#[async_trait]
impl TenantConfigStore for RecordStoreTenantConfig {
    async fn fetch(&self, tenant_id: &str) -> Result<Option<TenantRecord>, TenantStoreError> {
        let formula = equals_formula(TENANT_ID_FIELD, tenant_id);
        let records = self.client.list(&self.table, Some(&formula)).await?;
        Ok(records
            .into_iter()
            .next()
            .map(|record| Self::from_record(record, tenant_id)))
    }

    async fn create(
        &self,
        tenant_id: &str,
        values: &BTreeMap<SettingKey, String>,
    ) -> Result<TenantRecord, TenantStoreError> {
        let mut fields = Self::to_fields(values);
        fields.insert(
            TENANT_ID_FIELD.to_string(),
            Value::String(tenant_id.to_string()),
        );
        let record = self.client.create(&self.table, fields).await?;
        Ok(Self::from_record(record, tenant_id))
    }

    async fn update(
        &self,
        record: &TenantRecord,
        values: &BTreeMap<SettingKey, String>,
    ) -> Result<TenantRecord, TenantStoreError> {
        let fields = Self::to_fields(values);
        let updated = self
            .client
            .update(&self.table, &record.record_id, fields)
            .await?;
        Ok(Self::from_record(updated, &record.tenant_id))
    }
}

/// In-process tenant store for tests and local demos.
#[derive(Debug, Default)]
pub struct MemoryTenantStore {
    records: Mutex<BTreeMap<String, TenantRecord>>,
}

impl MemoryTenantStore {
    pub fn with_tenant<I>(tenant_id: &str, values: I) -> Self
    where
        I: IntoIterator<Item = (SettingKey, String)>,
    {
        let store = Self::default();
        store
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                tenant_id.to_string(),
                TenantRecord {
                    record_id: format!("rec-{tenant_id}"),
                    tenant_id: tenant_id.to_string(),
                    values: values.into_iter().collect(),
                },
            );
        store
    }

    pub fn record(&self, tenant_id: &str) -> Option<TenantRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_id)
            .cloned()
    }
}

#[async_trait]
impl TenantConfigStore for MemoryTenantStore {
    async fn fetch(&self, tenant_id: &str) -> Result<Option<TenantRecord>, TenantStoreError> {
        Ok(self.record(tenant_id))
    }

    async fn create(
        &self,
        tenant_id: &str,
        values: &BTreeMap<SettingKey, String>,
    ) -> Result<TenantRecord, TenantStoreError> {
        let record = TenantRecord {
            record_id: format!("rec-{tenant_id}"),
            tenant_id: tenant_id.to_string(),
            values: values.clone(),
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant_id.to_string(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        record: &TenantRecord,
        values: &BTreeMap<SettingKey, String>,
    ) -> Result<TenantRecord, TenantStoreError> {
        let mut guard = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = guard
            .get_mut(&record.tenant_id)
            .ok_or_else(|| {
                TenantStoreError::Unavailable(format!("no record for {}", record.tenant_id))
            })?;
        stored
            .values
            .extend(values.iter().map(|(key, value)| (*key, value.clone())));
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tenant_store(server: &MockServer) -> RecordStoreTenantConfig {
        let client = RecordStoreClient::new(reqwest::Client::new(), &server.uri(), "key", "appT")
            .expect("client builds");
        RecordStoreTenantConfig::new(client, "Tenants")
    }

    #[tokio::test]
    async fn fetch_translates_columns_to_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/appT/Tenants"))
            .and(query_param("filterByFormula", "{Tenant ID} = 'acme'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{
                    "id": "recA",
                    "fields": {
                        "Tenant ID": "acme",
                        "MLS API Key": "mls-123",
                        "Agent Name": "Dana Reyes",
                        "Unrelated": "x"
                    }
                }]
            })))
            .mount(&server)
            .await;

        let record = tenant_store(&server)
            .fetch("acme")
            .await
            .expect("fetch succeeds")
            .expect("record exists");

        assert_eq!(record.record_id, "recA");
        assert_eq!(record.value(SettingKey::MlsApiKey), Some("mls-123"));
        assert_eq!(record.value(SettingKey::AgentName), Some("Dana Reyes"));
        assert_eq!(record.values.len(), 2);
    }

    #[tokio::test]
    async fn create_writes_tenant_column_and_skips_local_only_keys() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/appT/Tenants"))
            .and(body_partial_json(json!({
                "fields": { "Tenant ID": "acme", "Agent Bio": "Local expert" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "recNew",
                "fields": { "Tenant ID": "acme", "Agent Bio": "Local expert" }
            })))
            .mount(&server)
            .await;

        let mut values = BTreeMap::new();
        values.insert(SettingKey::AgentBio, "Local expert".to_string());
        values.insert(SettingKey::AdminMode, "true".to_string());
        let fields = RecordStoreTenantConfig::to_fields(&values);
        assert!(!fields.contains_key("admin_mode"));
        assert_eq!(fields.len(), 1);

        let record = tenant_store(&server)
            .create("acme", &values)
            .await
            .expect("create succeeds");
        assert_eq!(record.record_id, "recNew");
        assert_eq!(record.tenant_id, "acme");
    }

    #[tokio::test]
    async fn memory_store_merges_updates() {
        let store = MemoryTenantStore::with_tenant(
            "acme",
            [(SettingKey::AgentName, "Dana".to_string())],
        );
        let record = store.fetch("acme").await.expect("fetch").expect("exists");

        let mut values = BTreeMap::new();
        values.insert(SettingKey::AgentBio, "Bio".to_string());
        let updated = store.update(&record, &values).await.expect("update");

        assert_eq!(updated.value(SettingKey::AgentName), Some("Dana"));
        assert_eq!(updated.value(SettingKey::AgentBio), Some("Bio"));
    }
}
