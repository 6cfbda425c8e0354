use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Every setting the site understands.
///
/// A key carries three names: the canonical one used by the local store and the JSON
/// API, the camel-case query parameter used by deployment URLs, and the column name in
/// the remote tenant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    TenantId,
    AirtableApiKey,
    AirtableBaseId,
    AgentFilter,
    MlsApiKey,
    MlsOutputType,
    MlsApiVersion,
    MlsPartnerKey,
    AgentName,
    AgentBio,
    AgentPhotoUrl,
    AgentEmail,
    AgentPhone,
    EmailSenderName,
    EmailSenderAddress,
    AdminMode,
    AppName,
    TemplateId,
}

impl SettingKey {
    pub const fn all() -> [Self; 18] {
        [
            Self::TenantId,
            Self::AirtableApiKey,
            Self::AirtableBaseId,
            Self::AgentFilter,
            Self::MlsApiKey,
            Self::MlsOutputType,
            Self::MlsApiVersion,
            Self::MlsPartnerKey,
            Self::AgentName,
            Self::AgentBio,
            Self::AgentPhotoUrl,
            Self::AgentEmail,
            Self::AgentPhone,
            Self::EmailSenderName,
            Self::EmailSenderAddress,
            Self::AdminMode,
            Self::AppName,
            Self::TemplateId,
        ]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::TenantId => "tenant_id",
            Self::AirtableApiKey => "airtable_api_key",
            Self::AirtableBaseId => "airtable_base_id",
            Self::AgentFilter => "agent_filter",
            Self::MlsApiKey => "mls_api_key",
            Self::MlsOutputType => "mls_output_type",
            Self::MlsApiVersion => "mls_api_version",
            Self::MlsPartnerKey => "mls_partner_key",
            Self::AgentName => "agent_name",
            Self::AgentBio => "agent_bio",
            Self::AgentPhotoUrl => "agent_photo_url",
            Self::AgentEmail => "agent_email",
            Self::AgentPhone => "agent_phone",
            Self::EmailSenderName => "email_sender_name",
            Self::EmailSenderAddress => "email_sender_address",
            Self::AdminMode => "admin_mode",
            Self::AppName => "app_name",
            Self::TemplateId => "template_id",
        }
    }

    pub const fn query_param(self) -> &'static str {
        match self {
            Self::TenantId => "tenantId",
            Self::AirtableApiKey => "airtableApiKey",
            Self::AirtableBaseId => "airtableBaseId",
            Self::AgentFilter => "agentFilter",
            Self::MlsApiKey => "mlsApiKey",
            Self::MlsOutputType => "mlsOutputType",
            Self::MlsApiVersion => "mlsApiVersion",
            Self::MlsPartnerKey => "mlsPartnerKey",
            Self::AgentName => "agentName",
            Self::AgentBio => "agentBio",
            Self::AgentPhotoUrl => "agentPhotoUrl",
            Self::AgentEmail => "agentEmail",
            Self::AgentPhone => "agentPhone",
            Self::EmailSenderName => "emailSenderName",
            Self::EmailSenderAddress => "emailSenderAddress",
            Self::AdminMode => "admin",
            Self::AppName => "appName",
            Self::TemplateId => "templateId",
        }
    }

    /// Column in the tenant record, `None` for keys that never leave this instance.
    pub const fn remote_field(self) -> Option<&'static str> {
        match self {
            Self::TenantId | Self::AdminMode | Self::AppName | Self::TemplateId => None,
            Self::AirtableApiKey => Some("Airtable API Key"),
            Self::AirtableBaseId => Some("Airtable Base ID"),
            Self::AgentFilter => Some("Agent Filter"),
            Self::MlsApiKey => Some("MLS API Key"),
            Self::MlsOutputType => Some("MLS Output Type"),
            Self::MlsApiVersion => Some("MLS API Version"),
            Self::MlsPartnerKey => Some("MLS Partner Key"),
            Self::AgentName => Some("Agent Name"),
            Self::AgentBio => Some("Agent Bio"),
            Self::AgentPhotoUrl => Some("Agent Photo URL"),
            Self::AgentEmail => Some("Agent Email"),
            Self::AgentPhone => Some("Agent Phone"),
            Self::EmailSenderName => Some("Email Sender Name"),
            Self::EmailSenderAddress => Some("Email Sender Address"),
        }
    }

    pub const fn is_secret(self) -> bool {
        matches!(
            self,
            Self::AirtableApiKey | Self::MlsApiKey | Self::MlsPartnerKey
        )
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown setting '{0}'")]
pub struct UnknownSetting(pub String);

impl FromStr for SettingKey {
    type Err = UnknownSetting;

    /// Accepts the canonical name or the query-parameter name.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::all()
            .into_iter()
            .find(|key| key.name() == trimmed || key.query_param() == trimmed)
            .ok_or_else(|| UnknownSetting(trimmed.to_string()))
    }
}

/// Resolved value of every key at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SettingsSnapshot(BTreeMap<SettingKey, String>);

impl SettingsSnapshot {
    pub fn new(values: BTreeMap<SettingKey, String>) -> Self {
        Self(values)
    }

    /// Resolved value, `""` when not set.
    pub fn get(&self, key: SettingKey) -> &str {
        self.0.get(&key).map(String::as_str).unwrap_or_default()
    }

    pub fn value(&self, key: SettingKey) -> Option<&str> {
        Some(self.get(key)).filter(|value| !value.is_empty())
    }

    pub fn is_set(&self, key: SettingKey) -> bool {
        self.value(key).is_some()
    }

    pub fn flag(&self, key: SettingKey) -> bool {
        self.get(key).trim().eq_ignore_ascii_case("true")
    }

    /// Copy with secret values masked, for logs and CLI output.
    pub fn redacted(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|(key, value)| {
                    let shown = if key.is_secret() && !value.is_empty() {
                        mask(value)
                    } else {
                        value.clone()
                    };
                    (*key, shown)
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (SettingKey, &str)> {
        self.0.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

fn mask(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("****{tail}")
}
