//! Agent profiles: the record store's agents table when configured, otherwise the
//! single profile agent described by the site settings.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::listings::aggregator::{NoticeKind, ProviderNotice};
use crate::listings::normalize::{cell_text, image_url};
use crate::record_store::{RecordStoreClient, StoreRecord, AGENTS_TABLE};
use crate::settings::{SettingKey, SettingsSnapshot};

/// Id of the agent built from site settings.
pub const PROFILE_AGENT_ID: &str = "profile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The agent configured through settings, if a name is set.
pub fn profile_agent(snapshot: &SettingsSnapshot) -> Option<Agent> {
    let name = snapshot.value(SettingKey::AgentName)?;
    Some(Agent {
        id: PROFILE_AGENT_ID.to_string(),
        name: name.to_string(),
        bio: snapshot.get(SettingKey::AgentBio).to_string(),
        photo_url: snapshot.value(SettingKey::AgentPhotoUrl).map(str::to_string),
        email: snapshot.value(SettingKey::AgentEmail).map(str::to_string),
        phone: snapshot.value(SettingKey::AgentPhone).map(str::to_string),
    })
}

fn text(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| fields.get(*name).and_then(cell_text))
}

pub fn agent_from_record(record: &StoreRecord) -> Agent {
    let fields = &record.fields;
    Agent {
        id: record.id.clone(),
        name: text(fields, &["Name", "Agent Name"]).unwrap_or_else(|| "Unnamed Agent".to_string()),
        bio: text(fields, &["Bio", "Biography"]).unwrap_or_default(),
        photo_url: ["Photo", "Headshot", "Photo URL"]
            .iter()
            .find_map(|name| fields.get(*name).and_then(|value| image_url(value, &["url"]))),
        email: text(fields, &["Email"]),
        phone: text(fields, &["Phone"]),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentRoster {
    pub agents: Vec<Agent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<ProviderNotice>,
}

#[derive(Debug, Clone)]
pub struct AgentDirectory {
    http: reqwest::Client,
    record_store_url: String,
}

impl AgentDirectory {
    pub fn new(http: reqwest::Client, record_store_url: impl Into<String>) -> Self {
        Self {
            http,
            record_store_url: record_store_url.into(),
        }
    }

    /// Agents for the resolved settings. Record-store failures fall back to the
    /// settings profile with a notice.
    pub async fn list(&self, snapshot: &SettingsSnapshot) -> AgentRoster {
        let profile = || profile_agent(snapshot).into_iter().collect::<Vec<_>>();

        let (Some(api_key), Some(base_id)) = (
            snapshot.value(SettingKey::AirtableApiKey),
            snapshot.value(SettingKey::AirtableBaseId),
        ) else {
            return AgentRoster {
                agents: profile(),
                notice: None,
            };
        };

        let fetched = match RecordStoreClient::new(
            self.http.clone(),
            &self.record_store_url,
            api_key,
            base_id,
        ) {
            Ok(client) => client.list(AGENTS_TABLE, None).await,
            Err(err) => Err(err),
        };

        match fetched {
            Ok(records) if !records.is_empty() => AgentRoster {
                agents: records.iter().map(agent_from_record).collect(),
                notice: None,
            },
            Ok(_) => AgentRoster {
                agents: profile(),
                notice: None,
            },
            Err(err) => {
                warn!(error = %err, "agent directory unavailable, using profile agent");
                AgentRoster {
                    agents: profile(),
                    notice: Some(ProviderNotice {
                        provider: "record_store",
                        kind: NoticeKind::Unavailable,
                        message: format!("Could not load agents: {err}"),
                    }),
                }
            }
        }
    }
}
