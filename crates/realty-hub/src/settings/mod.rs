//! Site settings: the closed key set, local and per-tenant storage, the three-tier
//! resolver and the automation API over it.

pub mod keys;
pub mod query;
pub mod resolver;
pub mod router;
pub mod service;
pub mod store;
pub mod tenant;

pub use keys::{SettingKey, SettingsSnapshot, UnknownSetting};
pub use query::QueryParams;
pub use resolver::{ConfigResolver, IngestReport, ResolveContext, WriteOutcome};
pub use router::{settings_router, API_KEY_HEADER};
pub use service::{SettingsPayload, SettingsService, SettingsServiceError, UpdateReceipt};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use tenant::{
    MemoryTenantStore, RecordStoreTenantConfig, TenantConfigStore, TenantRecord,
    TenantStoreError,
};
