use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use super::service::{SettingsPayload, SettingsService, SettingsServiceError, UpdateReceipt};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Automation endpoints for reading and upserting site settings.
pub fn settings_router(service: Arc<SettingsService>) -> Router {
    Router::new()
        .route(
            "/api/v1/settings",
            get(snapshot_handler).post(update_handler),
        )
        .route(
            "/api/v1/settings/record-store",
            post(record_store_handler),
        )
        .route("/api/v1/settings/ingest", post(ingest_handler))
        .with_state(service)
}

/// `x-api-key: <key>` or `Authorization: Bearer <key>`.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn error_response(error: SettingsServiceError) -> Response {
    let status = match &error {
        SettingsServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        SettingsServiceError::UnknownSetting(_)
        | SettingsServiceError::InvalidBody(_)
        | SettingsServiceError::InvalidValue(_)
        | SettingsServiceError::InvalidCredentials(_)
        | SettingsServiceError::InvalidUrl(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let payload = json!({
        "success": false,
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

/// Checks the key before the body is parsed, so a bad key is always a 401.
fn authorized_body<T: DeserializeOwned>(
    service: &SettingsService,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<T, SettingsServiceError> {
    service.authorize(presented_key(headers))?;
    serde_json::from_slice(body).map_err(|err| SettingsServiceError::InvalidBody(err.to_string()))
}

fn receipt_response(receipt: UpdateReceipt) -> Response {
    let updated: Vec<&str> = receipt.updated.iter().map(|key| key.name()).collect();
    let payload = json!({
        "success": true,
        "updated": updated,
        "remote": receipt.outcome.label(),
        "warning": receipt.outcome.warning(),
    });
    (StatusCode::OK, Json(payload)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SnapshotQuery {
    #[serde(default)]
    tenant: Option<String>,
}

pub(crate) async fn snapshot_handler(
    State(service): State<Arc<SettingsService>>,
    headers: HeaderMap,
    Query(query): Query<SnapshotQuery>,
) -> Response {
    match service.snapshot(presented_key(&headers), query.tenant).await {
        Ok(snapshot) => {
            let payload = json!({
                "success": true,
                "settings": snapshot,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler(
    State(service): State<Arc<SettingsService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: SettingsPayload = match authorized_body(&service, &headers, &body) {
        Ok(payload) => payload,
        Err(error) => return error_response(error),
    };
    match service.update(presented_key(&headers), payload).await {
        Ok(receipt) => receipt_response(receipt),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordStoreCredentials {
    api_key: String,
    base_id: String,
    #[serde(default)]
    tenant_id: Option<String>,
}

pub(crate) async fn record_store_handler(
    State(service): State<Arc<SettingsService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: RecordStoreCredentials = match authorized_body(&service, &headers, &body) {
        Ok(body) => body,
        Err(error) => return error_response(error),
    };
    let result = service
        .save_record_store_credentials(
            presented_key(&headers),
            &body.api_key,
            &body.base_id,
            body.tenant_id,
        )
        .await;

    match result {
        Ok(receipt) => receipt_response(receipt),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IngestRequest {
    url: String,
}

pub(crate) async fn ingest_handler(
    State(service): State<Arc<SettingsService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: IngestRequest = match authorized_body(&service, &headers, &body) {
        Ok(body) => body,
        Err(error) => return error_response(error),
    };
    match service.ingest_url(presented_key(&headers), &body.url).await {
        Ok(report) => {
            let absorbed: Vec<&str> = report.absorbed.iter().map(|key| key.name()).collect();
            let payload = json!({
                "success": true,
                "absorbed": absorbed,
                "remote": report.outcome.label(),
                "warning": report.outcome.warning(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}
