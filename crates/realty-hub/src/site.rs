//! Public, credential-free view of the site configuration and its agents.

use std::sync::Arc;

use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::agents::{profile_agent, Agent, AgentDirectory};
use crate::listings::request_context;
use crate::settings::{ConfigResolver, SettingKey, SettingsSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteProfile {
    pub app_name: String,
    pub template_id: String,
    pub admin_mode: bool,
    pub email_sender_name: String,
    pub agent: Option<Agent>,
    pub listings_enabled: bool,
}

impl SiteProfile {
    pub fn from_snapshot(snapshot: &SettingsSnapshot) -> Self {
        let record_store = snapshot.is_set(SettingKey::AirtableApiKey)
            && snapshot.is_set(SettingKey::AirtableBaseId);
        Self {
            app_name: snapshot.get(SettingKey::AppName).to_string(),
            template_id: snapshot.get(SettingKey::TemplateId).to_string(),
            admin_mode: snapshot.flag(SettingKey::AdminMode),
            email_sender_name: snapshot.get(SettingKey::EmailSenderName).to_string(),
            agent: profile_agent(snapshot),
            listings_enabled: record_store || snapshot.is_set(SettingKey::MlsApiKey),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SiteState {
    pub resolver: Arc<ConfigResolver>,
    pub agents: Arc<AgentDirectory>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TenantQuery {
    #[serde(default)]
    tenant: Option<String>,
}

pub fn site_router(state: SiteState) -> Router {
    Router::new()
        .route("/api/v1/site", get(profile_handler))
        .route("/api/v1/agents", get(agents_handler))
        .with_state(state)
}

pub(crate) async fn profile_handler(
    State(state): State<SiteState>,
    RawQuery(raw): RawQuery,
    Query(query): Query<TenantQuery>,
) -> Response {
    let ctx = request_context(raw.as_deref(), query.tenant);
    let snapshot = state.resolver.snapshot(&ctx).await;
    (StatusCode::OK, Json(SiteProfile::from_snapshot(&snapshot))).into_response()
}

pub(crate) async fn agents_handler(
    State(state): State<SiteState>,
    RawQuery(raw): RawQuery,
    Query(query): Query<TenantQuery>,
) -> Response {
    let ctx = request_context(raw.as_deref(), query.tenant);
    let snapshot = state.resolver.snapshot(&ctx).await;
    let roster = state.agents.list(&snapshot).await;
    (StatusCode::OK, Json(roster)).into_response()
}
