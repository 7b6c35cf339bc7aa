//! Integration tests for the catalog API client.
//!
//! Each test starts a [`MockCatalog`] on a loopback port and points a
//! `CatalogClient` at it.

#![allow(clippy::unwrap_used)]

use optika_core::ProductId;
use optika_integration_tests::{
    MockCatalog, MockRequest, MockResponse, lens_product_json, summary_json, within,
};
use optika_storefront::CatalogApiError;
use secrecy::SecretString;
use serde_json::json;

fn page(results: Vec<serde_json::Value>, next: Option<&str>) -> MockResponse {
    MockResponse::json(&json!({
        "count": results.len(),
        "next": next,
        "previous": null,
        "results": results,
    }))
}

// =============================================================================
// Product detail
// =============================================================================

#[tokio::test]
async fn test_get_product_parses_and_caches() {
    let api = MockCatalog::start(|req: &MockRequest| {
        if req.target == "/api/catalog/products/acuvue-oasys/" {
            MockResponse::json(&lens_product_json())
        } else {
            MockResponse::status(404, "{\"detail\": \"Not found.\"}")
        }
    })
    .await;
    let client = api.client();

    let product = within(client.get_product("acuvue-oasys")).await.unwrap();
    assert_eq!(product.id, ProductId::new(40));
    assert_eq!(product.variants.len(), 3);

    let again = within(client.get_product("acuvue-oasys")).await.unwrap();
    assert_eq!(again, product);
    assert_eq!(api.request_count(), 1, "second lookup must come from the cache");

    client.invalidate_cache();
    within(client.get_product("acuvue-oasys")).await.unwrap();
    assert_eq!(api.request_count(), 2);
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let api = MockCatalog::start(|_: &MockRequest| MockResponse::status(404, "{}")).await;
    let result = within(api.client().get_product("no-such-frame")).await;
    assert!(matches!(result, Err(CatalogApiError::NotFound(_))));
}

#[tokio::test]
async fn test_rate_limit_reports_retry_after() {
    let api = MockCatalog::start(|_: &MockRequest| {
        MockResponse::status(429, "{}").with_header("Retry-After", "7")
    })
    .await;
    let result = within(api.client().get_product("acuvue-oasys")).await;
    assert!(matches!(result, Err(CatalogApiError::RateLimited(7))));
}

#[tokio::test]
async fn test_server_error_keeps_status() {
    let api = MockCatalog::start(|_: &MockRequest| MockResponse::status(503, "maintenance")).await;
    match within(api.client().get_product("acuvue-oasys")).await {
        Err(CatalogApiError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let api = MockCatalog::start(|_: &MockRequest| MockResponse::status(200, "<html>")).await;
    let result = within(api.client().get_product("acuvue-oasys")).await;
    assert!(matches!(result, Err(CatalogApiError::Parse(_))));
}

#[tokio::test]
async fn test_invalid_product_is_rejected() {
    let api = MockCatalog::start(|_: &MockRequest| {
        let mut product = lens_product_json();
        product["price"] = json!("-5.00");
        MockResponse::json(&product)
    })
    .await;
    let result = within(api.client().get_product("acuvue-oasys")).await;
    assert!(matches!(result, Err(CatalogApiError::Invalid(_))));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let api = MockCatalog::start(|_: &MockRequest| MockResponse::json(&lens_product_json())).await;
    let mut config = api.config();
    config.token = Some(SecretString::from("catalog-token"));
    let client = optika_storefront::CatalogClient::new(&config).unwrap();

    within(client.get_product("acuvue-oasys")).await.unwrap();

    let request = api.requests().pop().unwrap();
    assert_eq!(
        request.header("authorization").as_deref(),
        Some("Bearer catalog-token")
    );
}

// =============================================================================
// Product list
// =============================================================================

#[tokio::test]
async fn test_list_products_clamps_page_size() {
    let api = MockCatalog::start(|_: &MockRequest| {
        page(vec![summary_json(1), summary_json(2)], Some("http://x/?page=2"))
    })
    .await;

    let products = within(api.client().list_products(0, 500)).await.unwrap();
    assert_eq!(products.results.len(), 2);
    assert!(products.has_next());

    let request = api.requests().pop().unwrap();
    assert_eq!(request.query("page").as_deref(), Some("1"));
    assert_eq!(request.query("page_size").as_deref(), Some("100"));
}

// =============================================================================
// Favorites lookup
// =============================================================================

#[tokio::test]
async fn test_products_by_ids_with_bulk_filter() {
    let api = MockCatalog::start(|req: &MockRequest| {
        let ids: Vec<i64> = req
            .query("ids")
            .map(|raw| raw.split(',').map(|s| s.parse().unwrap()).collect())
            .unwrap_or_default();
        page(ids.into_iter().map(summary_json).collect(), None)
    })
    .await;

    let products = within(
        api.client()
            .get_products_by_ids(&[ProductId::new(9), ProductId::new(3)]),
    )
    .await
    .unwrap();

    let ids: Vec<i64> = products.iter().map(|p| p.id.as_i64()).collect();
    assert_eq!(ids, vec![9, 3]);
    assert_eq!(api.request_count(), 1);
}

#[tokio::test]
async fn test_products_by_ids_falls_back_to_scan() {
    // Ignores filters entirely and serves two pages of three.
    let api = MockCatalog::start(|req: &MockRequest| {
        if req.query("page").as_deref() == Some("2") {
            page((4..=6).map(summary_json).collect(), None)
        } else {
            page((1..=3).map(summary_json).collect(), Some("http://x/?page=2"))
        }
    })
    .await;

    let products = within(
        api.client()
            .get_products_by_ids(&[ProductId::new(5), ProductId::new(2), ProductId::new(42)]),
    )
    .await
    .unwrap();

    let ids: Vec<i64> = products.iter().map(|p| p.id.as_i64()).collect();
    assert_eq!(ids, vec![5, 2]);
}
