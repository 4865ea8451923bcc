//! Upstream client integration tests against a mock API

use chrono::NaiveDate;
use httpmock::prelude::*;
use serde_json::{Value, json};
use shared::{Channel, DateWindow};
use sklad_client::{ClientConfig, Expand, UpstreamClient, UpstreamError};

const TOKEN: &str = "tenant-token";

fn window() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
    )
    .unwrap()
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(format!("{}/api/remap/1.2", server.base_url())).with_timeout(5)
}

fn document(id: &str, sum: f64) -> Value {
    json!({
        "id": id,
        "name": format!("N-{id}"),
        "moment": "2024-01-03 12:00:00.000",
        "created": "2024-01-03 12:00:00.000",
        "sum": sum
    })
}

#[tokio::test]
async fn test_follows_pages_until_size_is_reached() {
    let server = MockServer::start_async().await;

    let page1 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/remap/1.2/entity/customerorder")
                .header("authorization", format!("Bearer {TOKEN}"))
                .query_param_exists("filter")
                .query_param("order", "created,desc")
                .query_param("limit", "2")
                .query_param("offset", "0");
            then.status(200).json_body(json!({
                "meta": { "size": 3, "limit": 2, "offset": 0 },
                "rows": [document("o1", 10000.0), document("o2", 2550.0)]
            }));
        })
        .await;

    let page2 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/remap/1.2/entity/customerorder")
                .query_param("limit", "2")
                .query_param("offset", "2");
            then.status(200).json_body(json!({
                "meta": { "size": 3, "limit": 2, "offset": 2 },
                "rows": [document("o3", 100.0)]
            }));
        })
        .await;

    let client = UpstreamClient::new(&config(&server).with_page_limit(2), TOKEN).unwrap();
    let rows = client
        .fetch_all(Channel::Order, window(), Expand::None)
        .await
        .unwrap();

    page1.assert_async().await;
    page2.assert_async().await;
    let ids: Vec<_> = rows.iter().filter_map(|r| r.id.as_deref()).collect();
    assert_eq!(ids, ["o1", "o2", "o3"]);
    assert_eq!(rows[0].sum, 10000.0);
}

#[tokio::test]
async fn test_expanded_listing_caps_page_size() {
    let server = MockServer::start_async().await;

    let listing = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/remap/1.2/entity/retaildemand")
                .query_param("order", "moment,desc")
                .query_param("expand", "positions,positions.assortment,state,retailStore")
                .query_param("limit", "100");
            then.status(200).json_body(json!({
                "meta": { "size": 0, "limit": 100, "offset": 0 },
                "rows": []
            }));
        })
        .await;

    let client = UpstreamClient::new(&config(&server), TOKEN).unwrap();
    let rows = client
        .fetch_all(Channel::RetailSale, window(), Expand::Positions)
        .await
        .unwrap();

    listing.assert_async().await;
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_status_codes_are_classified() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.path("/api/remap/1.2/entity/customerorder");
            then.status(401).body("{\"errors\":[{\"error\":\"auth\"}]}");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.path("/api/remap/1.2/entity/retaildemand");
            then.status(400).body("bad filter");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.path("/api/remap/1.2/entity/retailsalesreturn");
            then.status(503).body("maintenance");
        })
        .await;

    let client = UpstreamClient::new(&config(&server), TOKEN).unwrap();

    let auth = client.fetch_all(Channel::Order, window(), Expand::None).await;
    assert!(matches!(auth, Err(UpstreamError::AuthFailure)));

    let bad = client.fetch_all(Channel::RetailSale, window(), Expand::None).await;
    assert!(matches!(bad, Err(UpstreamError::BadRequest(ref m)) if m == "bad filter"));

    let server_err = client
        .fetch_all(Channel::RetailReturn, window(), Expand::None)
        .await
        .unwrap_err();
    assert!(matches!(server_err, UpstreamError::Server { status: 503, .. }));
    assert!(server_err.is_transient());
}

#[tokio::test]
async fn test_missing_rows_is_invalid_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/api/remap/1.2/entity/customerorder");
            then.status(200).json_body(json!({ "meta": { "size": 0 } }));
        })
        .await;

    let client = UpstreamClient::new(&config(&server), TOKEN).unwrap();
    let err = client
        .fetch_all(Channel::Order, window(), Expand::None)
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_connection_failure_is_transient() {
    let config = ClientConfig::new("http://127.0.0.1:9/api").with_timeout(2);
    let client = UpstreamClient::new(&config, TOKEN).unwrap();
    let err = client
        .fetch_all(Channel::Order, window(), Expand::None)
        .await
        .unwrap_err();
    assert!(err.is_transient(), "unexpected {err:?}");
}

#[tokio::test]
async fn test_fetch_positions_expands_assortment() {
    let server = MockServer::start_async().await;
    let positions = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/remap/1.2/entity/customerorder/o1/positions")
                .query_param("expand", "assortment");
            then.status(200).json_body(json!({
                "meta": { "size": 1 },
                "rows": [{
                    "quantity": 3.0,
                    "price": 5000.0,
                    "assortment": { "meta": { "href": "x" }, "name": "Coffee" }
                }]
            }));
        })
        .await;

    let client = UpstreamClient::new(&config(&server), TOKEN).unwrap();
    let rows = client.fetch_positions(Channel::Order, "o1").await.unwrap();

    positions.assert_async().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 3.0);
    assert_eq!(
        rows[0].assortment.as_ref().and_then(|a| a.name.as_deref()),
        Some("Coffee")
    );
}

#[tokio::test]
async fn test_fetch_named_stays_on_upstream_host() {
    let server = MockServer::start_async().await;
    let product = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/remap/1.2/entity/product/p1")
                .header("authorization", format!("Bearer {TOKEN}"));
            then.status(200).json_body(json!({
                "meta": { "href": "self" },
                "name": "Green tea"
            }));
        })
        .await;

    let client = UpstreamClient::new(&config(&server), TOKEN).unwrap();
    let href = format!("{}/api/remap/1.2/entity/product/p1", server.base_url());
    let named = client.fetch_named(&href).await.unwrap();
    product.assert_async().await;
    assert_eq!(named.name.as_deref(), Some("Green tea"));

    let foreign = client.fetch_named("https://elsewhere.example/entity/product/p1").await;
    assert!(matches!(foreign, Err(UpstreamError::BadRequest(_))));

    // same path on a lookalike host
    let lookalike = format!("http://{}.evil.example/api/remap/1.2/entity/product/p1", server.host());
    let result = client.fetch_named(&lookalike).await;
    assert!(matches!(result, Err(UpstreamError::BadRequest(_))));
}

#[tokio::test]
async fn test_validate_token() {
    let server = MockServer::start_async().await;
    let good = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/remap/1.2/entity/counterparty")
                .query_param("limit", "1")
                .header("authorization", "Bearer good");
            then.status(200).json_body(json!({ "meta": {}, "rows": [] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/remap/1.2/entity/counterparty")
                .header("authorization", "Bearer bad");
            then.status(401);
        })
        .await;

    let ok = UpstreamClient::new(&config(&server), "good").unwrap();
    assert!(ok.validate_token().await);
    good.assert_async().await;

    let rejected = UpstreamClient::new(&config(&server), "bad").unwrap();
    assert!(!rejected.validate_token().await);
}
