use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use realty_hub::config::ProviderEndpoints;
use realty_hub::listings::{listing_router, EmptyFallback, ListingService};
use realty_hub::settings::{ConfigResolver, MemorySettingsStore, SettingKey};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn app() -> (MockServer, Router) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/appHarbor/Properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {
                    "id": "recOak",
                    "fields": {
                        "Address": "12 Oak Lane", "City": "Portland", "Price": 425000,
                        "Bedrooms": 3, "Property Type": "House"
                    }
                },
                {
                    "id": "recElm",
                    "fields": {
                        "Address": "4 Elm Court", "City": "Portland", "Price": 1850,
                        "Bedrooms": 1, "Listing Type": "For Rent", "Property Type": "Condo"
                    }
                },
                {
                    "id": "recMaple",
                    "fields": {
                        "Address": "80 Maple Drive", "City": "Salem", "Price": 610000,
                        "Bedrooms": 4, "Property Type": "House"
                    }
                }
            ]
        })))
        .mount(&server)
        .await;

    let store = MemorySettingsStore::with_values([
        (SettingKey::AirtableApiKey, "store-key".to_string()),
        (SettingKey::AirtableBaseId, "appHarbor".to_string()),
    ]);
    let resolver = Arc::new(ConfigResolver::new(Arc::new(store)));
    let endpoints = ProviderEndpoints {
        record_store_url: server.uri(),
        mls_url: format!("{}/mls", server.uri()),
    };
    let service = ListingService::new(
        resolver,
        endpoints,
        reqwest::Client::new(),
        Arc::new(EmptyFallback),
    );
    (server, listing_router(Arc::new(service)))
}

async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
    let response: Response = app
        .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json"))
}

fn ids(body: &Value) -> Vec<String> {
    body["listings"]
        .as_array()
        .expect("listings array")
        .iter()
        .map(|listing| listing["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn price_and_bedroom_filters_combine() {
    let (_server, app) = app().await;
    let (status, body) = call(
        app,
        "/api/v1/listings?min_price=100000&max_price=500000&min_bedrooms=3",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["recOak"]);
    assert_eq!(body["total"], 3);
    assert_eq!(body["property_types"], json!(["Condo", "House"]));
}

#[tokio::test]
async fn search_and_tab_narrow_the_page() {
    let (_server, app) = app().await;
    let (status, body) = call(app, "/api/v1/listings?search=elm&tab=rent").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["recElm"]);
}

#[tokio::test]
async fn blank_filter_parameters_are_ignored() {
    let (_server, app) = app().await;
    let (status, body) = call(app, "/api/v1/listings?min_price=&property_type=&tab=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["recOak", "recElm", "recMaple"]);
}

#[tokio::test]
async fn detail_returns_the_listing_or_404() {
    let (_server, app) = app().await;

    let (status, body) = call(app.clone(), "/api/v1/listings/recElm").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address"], "4 Elm Court");

    let (status, body) = call(app, "/api/v1/listings/recMissing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "error": "listing not found", "listing_id": "recMissing" })
    );
}
