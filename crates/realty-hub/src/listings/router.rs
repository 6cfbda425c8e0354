use std::sync::Arc;

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::filter::ListingFilter;
use super::service::ListingService;
use crate::settings::{QueryParams, ResolveContext};

/// Public listing endpoints. Setting parameters on the request (`mlsApiKey`, ...)
/// override stored settings for that request only.
pub fn listing_router(service: Arc<ListingService>) -> Router {
    Router::new()
        .route("/api/v1/listings", get(search_handler))
        .route("/api/v1/listings/:listing_id", get(detail_handler))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScopeQuery {
    #[serde(default)]
    pub(crate) agent: Option<String>,
    #[serde(default)]
    pub(crate) tenant: Option<String>,
}

/// Resolution context for a request: its raw query string plus an explicit tenant.
pub fn request_context(raw_query: Option<&str>, tenant: Option<String>) -> ResolveContext {
    let ctx = ResolveContext::from_params(QueryParams::parse(raw_query.unwrap_or_default()));
    match tenant.filter(|tenant| !tenant.trim().is_empty()) {
        Some(tenant) => ctx.with_tenant(tenant),
        None => ctx,
    }
}

pub(crate) async fn search_handler(
    State(service): State<Arc<ListingService>>,
    RawQuery(raw): RawQuery,
    Query(scope): Query<ScopeQuery>,
    Query(filter): Query<ListingFilter>,
) -> Response {
    let ctx = request_context(raw.as_deref(), scope.tenant);
    let page = service.search(&ctx, scope.agent, &filter).await;
    (StatusCode::OK, Json(page)).into_response()
}

pub(crate) async fn detail_handler(
    State(service): State<Arc<ListingService>>,
    Path(listing_id): Path<String>,
    RawQuery(raw): RawQuery,
    Query(scope): Query<ScopeQuery>,
) -> Response {
    let ctx = request_context(raw.as_deref(), scope.tenant);
    match service.find(&ctx, &listing_id).await {
        Some(listing) => (StatusCode::OK, Json(listing)).into_response(),
        None => {
            let payload = json!({
                "error": "listing not found",
                "listing_id": listing_id,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}
