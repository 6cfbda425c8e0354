use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::keys::{SettingKey, SettingsSnapshot};
use super::query::QueryParams;
use super::store::SettingsStore;
use super::tenant::{TenantConfigStore, TenantRecord, TenantStoreError};

/// Where a read is being resolved from: the request's query string and, optionally,
/// an explicitly selected tenant.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    pub params: QueryParams,
    pub tenant: Option<String>,
}

impl ResolveContext {
    pub fn from_params(params: QueryParams) -> Self {
        Self {
            params,
            tenant: None,
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }
}

/// Result of a write. The local store always holds the value afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No tenant (or no remote tier, or only local-only keys): local store only.
    Local,
    /// Local store and the tenant's remote record both hold the values.
    Replicated,
    /// Local store succeeded, the remote upsert did not.
    LocalOnly { reason: String },
}

impl WriteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WriteOutcome::Local => "local",
            WriteOutcome::Replicated => "stored",
            WriteOutcome::LocalOnly { .. } => "local_only",
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            WriteOutcome::LocalOnly { reason } => Some(reason.as_str()),
            _ => None,
        }
    }
}

/// Settings absorbed from a deployment URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub absorbed: Vec<SettingKey>,
    pub outcome: WriteOutcome,
}

/// Answers "what is setting K right now" with URL parameter > tenant record > local
/// store precedence, and writes through to every tier that can hold a value.
#[derive(Clone)]
pub struct ConfigResolver {
    local: Arc<dyn SettingsStore>,
    remote: Option<Arc<dyn TenantConfigStore>>,
    default_tenant: Option<String>,
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("remote", &self.remote.is_some())
            .field("default_tenant", &self.default_tenant)
            .finish_non_exhaustive()
    }
}

impl ConfigResolver {
    pub fn new(local: Arc<dyn SettingsStore>) -> Self {
        Self {
            local,
            remote: None,
            default_tenant: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn TenantConfigStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_default_tenant(mut self, tenant: Option<String>) -> Self {
        self.default_tenant = tenant.filter(|value| !value.trim().is_empty());
        self
    }

    /// Tenant in effect for `ctx`: explicit selection, then `tenantId` parameter, then
    /// the locally stored id, then the configured default.
    pub fn tenant_for(&self, ctx: &ResolveContext) -> Option<String> {
        ctx.tenant
            .as_deref()
            .map(str::trim)
            .filter(|tenant| !tenant.is_empty())
            .or_else(|| ctx.params.setting(SettingKey::TenantId).map(str::trim))
            .map(str::to_string)
            .or_else(|| {
                self.local_value(SettingKey::TenantId)
                    .map(|tenant| tenant.trim().to_string())
            })
            .or_else(|| self.default_tenant.clone())
    }

    fn local_value(&self, key: SettingKey) -> Option<String> {
        self.local.load(key).filter(|value| !value.trim().is_empty())
    }

    async fn remote_record(&self, tenant: Option<&str>) -> Option<TenantRecord> {
        let (remote, tenant) = match (self.remote.as_ref(), tenant) {
            (Some(remote), Some(tenant)) => (remote, tenant),
            _ => return None,
        };

        match remote.fetch(tenant).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                debug!(tenant, "no remote configuration record for tenant");
                None
            }
            Err(err) => {
                warn!(tenant, error = %err, "remote tenant configuration unavailable, using local settings");
                None
            }
        }
    }

    fn pick(
        &self,
        key: SettingKey,
        params: &QueryParams,
        record: Option<&TenantRecord>,
    ) -> String {
        if let Some(value) = params.setting(key) {
            return value.to_string();
        }
        if let Some(value) = record.and_then(|record| record.value(key)) {
            return value.to_string();
        }
        self.local_value(key).unwrap_or_default()
    }

    /// Resolved value of `key`, `""` when no tier holds one. Never fails.
    pub async fn get(&self, key: SettingKey, ctx: &ResolveContext) -> String {
        if let Some(value) = ctx.params.setting(key) {
            return value.to_string();
        }

        let record = if key.remote_field().is_some() {
            let tenant = self.tenant_for(ctx);
            self.remote_record(tenant.as_deref()).await
        } else {
            None
        };

        self.pick(key, &ctx.params, record.as_ref())
    }

    /// Every key resolved against a single read of the tenant record.
    pub async fn snapshot(&self, ctx: &ResolveContext) -> SettingsSnapshot {
        let tenant = self.tenant_for(ctx);
        let record = self.remote_record(tenant.as_deref()).await;

        let values = SettingKey::all()
            .into_iter()
            .map(|key| (key, self.pick(key, &ctx.params, record.as_ref())))
            .collect();
        SettingsSnapshot::new(values)
    }

    pub async fn set(&self, key: SettingKey, value: &str, tenant: Option<&str>) -> WriteOutcome {
        let mut values = BTreeMap::new();
        values.insert(key, value.to_string());
        self.set_many(&values, tenant).await
    }

    /// Writes every value locally, then upserts the remote-capable ones into the
    /// tenant's record. Without an explicit tenant the write targets the same tenant
    /// reads resolve to. A remote failure never rolls back the local write.
    pub async fn set_many(
        &self,
        values: &BTreeMap<SettingKey, String>,
        tenant: Option<&str>,
    ) -> WriteOutcome {
        for (key, value) in values {
            self.local.save(*key, value);
        }

        let remote_values: BTreeMap<SettingKey, String> = values
            .iter()
            .filter(|(key, _)| key.remote_field().is_some())
            .map(|(key, value)| {
                let value = if value.trim().is_empty() {
                    String::new()
                } else {
                    value.clone()
                };
                (*key, value)
            })
            .collect();

        let tenant = tenant
            .map(str::trim)
            .filter(|tenant| !tenant.is_empty())
            .map(str::to_string)
            .or_else(|| self.tenant_for(&ResolveContext::default()));
        let (remote, tenant) = match (self.remote.as_ref(), tenant.as_deref()) {
            (Some(remote), Some(tenant)) if !remote_values.is_empty() => (remote, tenant),
            _ => return WriteOutcome::Local,
        };

        match upsert(remote.as_ref(), tenant, &remote_values).await {
            Ok(record) => {
                debug!(tenant, record = %record.record_id, keys = remote_values.len(), "tenant configuration replicated");
                WriteOutcome::Replicated
            }
            Err(err) => {
                warn!(tenant, error = %err, "tenant configuration not replicated, kept locally");
                WriteOutcome::LocalOnly {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Explicitly unsets `key` in the local store.
    pub fn clear(&self, key: SettingKey) {
        self.local.clear(key);
    }

    /// Absorbs every non-empty setting parameter, replicating to the tenant named by
    /// the parameters (or the otherwise effective tenant).
    pub async fn ingest(&self, params: &QueryParams) -> IngestReport {
        let values: BTreeMap<SettingKey, String> = params
            .settings()
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect();

        if values.is_empty() {
            return IngestReport {
                absorbed: Vec::new(),
                outcome: WriteOutcome::Local,
            };
        }

        let tenant = self.tenant_for(&ResolveContext::from_params(params.clone()));
        let outcome = self.set_many(&values, tenant.as_deref()).await;
        let absorbed: Vec<SettingKey> = values.into_keys().collect();
        debug!(count = absorbed.len(), "settings ingested from url parameters");

        IngestReport { absorbed, outcome }
    }
}

async fn upsert(
    remote: &dyn TenantConfigStore,
    tenant: &str,
    values: &BTreeMap<SettingKey, String>,
) -> Result<TenantRecord, TenantStoreError> {
    match remote.fetch(tenant).await? {
        Some(record) => remote.update(&record, values).await,
        None => remote.create(tenant, values).await,
    }
}
