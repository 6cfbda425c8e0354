use metrics_exporter_prometheus::PrometheusHandle;
use realty_hub::agents::AgentDirectory;
use realty_hub::config::AppConfig;
use realty_hub::contact::{ContactService, MemoryContactInbox};
use realty_hub::error::AppError;
use realty_hub::listings::{ListingService, SampleListings};
use realty_hub::record_store::RecordStoreClient;
use realty_hub::settings::{
    ConfigResolver, FileSettingsStore, RecordStoreTenantConfig, SettingsService,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the routes and CLI commands share, wired from one configuration.
pub(crate) struct Services {
    pub(crate) resolver: Arc<ConfigResolver>,
    pub(crate) settings: Arc<SettingsService>,
    pub(crate) listings: Arc<ListingService>,
    pub(crate) agents: Arc<AgentDirectory>,
    pub(crate) contact: Arc<ContactService<MemoryContactInbox>>,
}

pub(crate) fn http_client() -> Result<reqwest::Client, AppError> {
    let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
    Ok(client)
}

pub(crate) fn build_resolver(
    config: &AppConfig,
    http: &reqwest::Client,
) -> Result<ConfigResolver, AppError> {
    let local = Arc::new(FileSettingsStore::open(&config.storage.settings_path));
    let mut resolver = ConfigResolver::new(local)
        .with_default_tenant(config.storage.default_tenant.clone());

    if let Some(tenant_store) = &config.storage.tenant_store {
        let client = RecordStoreClient::new(
            http.clone(),
            &config.providers.record_store_url,
            tenant_store.api_key.clone(),
            tenant_store.base_id.clone(),
        )?;
        info!(table = %tenant_store.table, "tenant configuration store enabled");
        resolver = resolver.with_remote(Arc::new(RecordStoreTenantConfig::new(
            client,
            tenant_store.table.clone(),
        )));
    }

    Ok(resolver)
}

pub(crate) fn build_services(config: &AppConfig) -> Result<Services, AppError> {
    let http = http_client()?;
    let resolver = Arc::new(build_resolver(config, &http)?);

    let settings = Arc::new(SettingsService::new(
        resolver.clone(),
        config.admin.api_key.clone(),
        http.clone(),
        config.providers.record_store_url.clone(),
    ));
    let listings = Arc::new(ListingService::new(
        resolver.clone(),
        config.providers.clone(),
        http.clone(),
        Arc::new(SampleListings),
    ));
    let agents = Arc::new(AgentDirectory::new(
        http,
        config.providers.record_store_url.clone(),
    ));
    let contact = Arc::new(ContactService::new(
        Arc::new(MemoryContactInbox::default()),
        resolver.clone(),
    ));

    Ok(Services {
        resolver,
        settings,
        listings,
        agents,
        contact,
    })
}
