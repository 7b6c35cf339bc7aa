//! Integration test support for Optika.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p optika-integration-tests
//! ```
//!
//! No external services are needed: storage lives in a temporary directory
//! and the catalog API is served by [`MockCatalog`] on a loopback port.
//!
//! # Test Categories
//!
//! - `cross_tab_sync` - several tabs sharing one storage directory and bus
//! - `storefront_flow` - product page to cart, persistence across restarts
//! - `catalog_client` - HTTP client against the mock catalog

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use optika_core::Product;
use optika_storefront::storage::FileStorage;
use optika_storefront::sync::StorageBus;
use optika_storefront::{CatalogClient, CatalogConfig, Tab};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long to wait for a cross-tab change before failing.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Storage
// =============================================================================

/// A shopper's browser: one storage directory, one bus, any number of tabs.
pub struct TestContext {
    pub dir: TempDir,
    pub storage: Arc<FileStorage>,
    pub bus: StorageBus,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path()));
        Self {
            dir,
            storage,
            bus: StorageBus::default(),
        }
    }

    /// Open another tab. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn open_tab(&self) -> Tab {
        Tab::open(self.storage.clone(), &self.bus)
    }

    /// Simulate a browser restart: same directory, fresh bus.
    #[must_use]
    pub fn restart(self) -> Self {
        Self {
            dir: self.dir,
            storage: self.storage,
            bus: StorageBus::default(),
        }
    }

    /// Raw file contents of a storage key.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(format!("{key}.json"))).ok()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait until `receiver` holds a value matching `predicate`.
///
/// Returns `false` on timeout.
pub async fn wait_for<T>(receiver: &mut watch::Receiver<T>, predicate: impl Fn(&T) -> bool) -> bool {
    tokio::time::timeout(SYNC_TIMEOUT, receiver.wait_for(|value| predicate(value)))
        .await
        .is_ok_and(|result| result.is_ok())
}

/// Give background tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// =============================================================================
// Fixtures
// =============================================================================

/// Contact lenses with two attributes and three variants, one sold out.
#[must_use]
pub fn lens_product() -> Product {
    serde_json::from_value(lens_product_json()).unwrap()
}

#[must_use]
pub fn lens_product_json() -> serde_json::Value {
    serde_json::json!({
        "id": 40, "name": "Acuvue Oasys", "slug": "acuvue-oasys", "price": "1800.00",
        "old_price": null, "stock": null, "main_image_url": "https://cdn.example/oasys.jpg",
        "available_attributes": [
            {"id": 1, "name": "Diopter", "slug": "diopter", "values": [
                {"id": 10, "value": "-1.00", "slug": "m100"},
                {"id": 11, "value": "-1.25", "slug": "m125"},
                {"id": 12, "value": "-1.50", "slug": "m150"}]},
            {"id": 2, "name": "Base curve", "slug": "base-curve", "values": [
                {"id": 20, "value": "8.4", "slug": "84"},
                {"id": 21, "value": "8.8", "slug": "88"}]}
        ],
        "variants": [
            {"id": 401, "sku": "OAS-100-84", "price": "1800.00", "old_price": null, "stock": 3,
             "is_active": true, "attribute_values": [
                {"attribute_id": 1, "id": 10, "value": "-1.00", "attribute_name": "Diopter"},
                {"attribute_id": 2, "id": 20, "value": "8.4", "attribute_name": "Base curve"}]},
            {"id": 402, "sku": "OAS-125-88", "price": "1900.00", "old_price": "2100.00", "stock": 1,
             "is_active": true, "attribute_values": [
                {"attribute_id": 1, "id": 11, "value": "-1.25", "attribute_name": "Diopter"},
                {"attribute_id": 2, "id": 21, "value": "8.8", "attribute_name": "Base curve"}]},
            {"id": 403, "sku": "OAS-150-84", "price": "1800.00", "old_price": null, "stock": 0,
             "is_active": true, "attribute_values": [
                {"attribute_id": 1, "id": 12, "value": "-1.50", "attribute_name": "Diopter"},
                {"attribute_id": 2, "id": 20, "value": "8.4", "attribute_name": "Base curve"}]}
        ]
    })
}

/// A product list entry.
#[must_use]
pub fn summary_json(id: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id, "name": format!("Frame {id}"), "slug": format!("frame-{id}"),
        "price": format!("{}.00", 1000 + id), "old_price": null, "main_image_url": null,
        "has_variations": false, "price_range": null
    })
}

// =============================================================================
// Mock catalog API
// =============================================================================

/// A request received by the mock.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Path and query, e.g. `/api/catalog/products/?page=1&page_size=20`.
    pub target: String,
    pub headers: HeaderMap,
}

impl MockRequest {
    /// Value of a request header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)?
            .to_str()
            .ok()
            .map(ToString::to_string)
    }

    /// Decoded value of a query parameter.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        let query = self.target.split_once('?')?.1;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: value.to_string(),
        }
    }

    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap();
        let mut response = (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response();
        for (name, value) in self.headers {
            response.headers_mut().insert(
                HeaderName::try_from(name).unwrap(),
                HeaderValue::try_from(value).unwrap(),
            );
        }
        response
    }
}

type Handler = dyn Fn(&MockRequest) -> MockResponse + Send + Sync;

#[derive(Clone)]
struct MockState {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

/// Catalog API stand-in: an axum router whose fallback answers every request
/// through a handler and records it.
pub struct MockCatalog {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<MockRequest>>>,
    task: JoinHandle<()>,
}

impl MockCatalog {
    pub async fn start(
        handler: impl Fn(&MockRequest) -> MockResponse + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new().fallback(respond).with_state(MockState {
            handler: Arc::new(handler),
            requests: requests.clone(),
        });
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    /// Base URL of the API, ending in `/api`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// A client pointed at this mock.
    #[must_use]
    pub fn client(&self) -> CatalogClient {
        CatalogClient::new(&self.config()).unwrap()
    }

    #[must_use]
    pub fn config(&self) -> CatalogConfig {
        let mut config = CatalogConfig::with_base_url(&self.base_url()).unwrap();
        config.timeout = Duration::from_secs(5);
        config
    }

    #[must_use]
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().unwrap().clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Drop for MockCatalog {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn respond(State(state): State<MockState>, uri: Uri, headers: HeaderMap) -> Response {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);
    let request = MockRequest { target, headers };

    let response = (state.handler)(&request);
    state.requests.lock().unwrap().push(request);
    response.into_response()
}

/// Run `future` with a deadline; panics on timeout.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .unwrap()
}
