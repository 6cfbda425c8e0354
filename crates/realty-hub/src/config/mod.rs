use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_RECORD_STORE_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_MLS_URL: &str = "https://mls.example.com/api/listings";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub admin: AdminConfig,
    pub storage: StorageConfig,
    pub providers: ProviderEndpoints,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let record_store_url = optional_var("REALTY_RECORD_STORE_URL")
            .unwrap_or_else(|| DEFAULT_RECORD_STORE_URL.to_string());
        let mls_url =
            optional_var("REALTY_MLS_URL").unwrap_or_else(|| DEFAULT_MLS_URL.to_string());
        for (name, value) in [
            ("REALTY_RECORD_STORE_URL", &record_store_url),
            ("REALTY_MLS_URL", &mls_url),
        ] {
            url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                variable: name,
                source,
            })?;
        }

        let tenant_store = match (
            optional_var("REALTY_TENANT_STORE_API_KEY"),
            optional_var("REALTY_TENANT_STORE_BASE_ID"),
        ) {
            (Some(api_key), Some(base_id)) => Some(TenantStoreConfig {
                api_key,
                base_id,
                table: optional_var("REALTY_TENANT_TABLE").unwrap_or_else(|| "Tenants".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            admin: AdminConfig {
                api_key: optional_var("REALTY_ADMIN_API_KEY"),
            },
            storage: StorageConfig {
                settings_path: optional_var("REALTY_SETTINGS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/settings.json")),
                default_tenant: optional_var("REALTY_TENANT_ID"),
                tenant_store,
            },
            providers: ProviderEndpoints {
                record_store_url,
                mls_url,
            },
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Static key guarding the settings API. `None` rejects every call.
#[derive(Clone, Default)]
pub struct AdminConfig {
    pub api_key: Option<String>,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub settings_path: PathBuf,
    pub default_tenant: Option<String>,
    pub tenant_store: Option<TenantStoreConfig>,
}

/// Record-store base that holds one configuration record per tenant.
#[derive(Clone)]
pub struct TenantStoreConfig {
    pub api_key: String,
    pub base_id: String,
    pub table: String,
}

impl fmt::Debug for TenantStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantStoreConfig")
            .field("base_id", &self.base_id)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Base URLs of the outbound listing providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub record_store_url: String,
    pub mls_url: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            record_store_url: DEFAULT_RECORD_STORE_URL.to_string(),
            mls_url: DEFAULT_MLS_URL.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidUrl {
        variable: &'static str,
        source: url::ParseError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUrl { variable, .. } => {
                write!(f, "{variable} must be an absolute URL")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidUrl { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "REALTY_ADMIN_API_KEY",
            "REALTY_SETTINGS_PATH",
            "REALTY_TENANT_ID",
            "REALTY_TENANT_STORE_API_KEY",
            "REALTY_TENANT_STORE_BASE_ID",
            "REALTY_TENANT_TABLE",
            "REALTY_RECORD_STORE_URL",
            "REALTY_MLS_URL",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.admin.api_key.is_none());
        assert!(config.storage.tenant_store.is_none());
        assert_eq!(
            config.storage.settings_path,
            PathBuf::from("data/settings.json")
        );
        assert_eq!(config.providers, ProviderEndpoints::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn tenant_store_requires_both_credentials() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REALTY_TENANT_STORE_API_KEY", "key");
        let config = AppConfig::load().expect("config loads");
        assert!(config.storage.tenant_store.is_none());

        env::set_var("REALTY_TENANT_STORE_BASE_ID", "appTenants");
        let config = AppConfig::load().expect("config loads");
        let store = config.storage.tenant_store.expect("tenant store configured");
        assert_eq!(store.table, "Tenants");
        assert_eq!(store.base_id, "appTenants");
        reset_env();
    }

    #[test]
    fn rejects_relative_provider_url() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REALTY_MLS_URL", "not a url");
        let err = AppConfig::load().expect_err("relative url rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                variable: "REALTY_MLS_URL",
                ..
            }
        ));
        reset_env();
    }
}
