//! Catalog API client.
//!
//! Talks JSON over HTTP to the upstream catalog service with `reqwest`.
//! Product details and list pages are cached using `moka` (5-minute TTL by
//! default).

mod cache;
pub mod lookup;

use std::sync::Arc;

use moka::future::Cache;
use optika_core::{CatalogError, Page, Product, ProductId, ProductSummary};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogConfig;

use cache::{CacheKey, CacheValue};
use lookup::{MAX_PAGE_SIZE, ProductSource};

/// Errors from the catalog API.
#[derive(Debug, Error)]
pub enum CatalogApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The payload parsed but is structurally invalid.
    #[error("Invalid catalog data: {0}")]
    Invalid(#[from] CatalogError),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(String),
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the catalog API.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogApiError> {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                cache,
            }),
        })
    }

    /// Build `<base>/<segments...>/`. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CatalogApiError::Url(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    fn products_url(&self, params: &[(String, String)]) -> Result<Url, CatalogApiError> {
        let mut url = self.endpoint(&["catalog", "products"])?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Execute a GET request and parse the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogApiError> {
        let mut request = self
            .inner
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CatalogApiError::RateLimited(retry_after));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogApiError::NotFound(url.path().to_string()));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate(&response_text, 500),
                "Catalog API returned non-success status"
            );
            return Err(CatalogApiError::Status {
                status: status.as_u16(),
                body: truncate(&response_text, 200),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text, 500),
                "Failed to parse catalog API response"
            );
            CatalogApiError::Parse(e)
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found, the request fails, or the
    /// payload is structurally invalid.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, CatalogApiError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(CatalogApiError::NotFound("empty product slug".to_string()));
        }

        let cache_key = CacheKey::Product(slug.to_string());

        // Check cache
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&["catalog", "products", slug])?;
        let product: Product = self.get_json(url).await?;
        product.validate()?;

        // Cache the result
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get one page of the product list.
    ///
    /// `page` starts at 1; `page_size` is clamped to what the API accepts.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Page<ProductSummary>, CatalogApiError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let cache_key = CacheKey::Products { page, page_size };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let url = self.products_url(&[
            ("page".to_string(), page.to_string()),
            ("page_size".to_string(), page_size.to_string()),
        ])?;
        let products: Page<ProductSummary> = self.get_json(url).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get summaries for the given product IDs, in the given order.
    ///
    /// See [`lookup::fetch_products_by_ids`] for how filtering falls back when
    /// the API does not support it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the final page scan fails.
    #[instrument(skip(self), fields(count = ids.len()))]
    pub async fn get_products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<ProductSummary>, CatalogApiError> {
        lookup::fetch_products_by_ids(self, ids).await
    }

    /// Drop every cached response.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl ProductSource for CatalogClient {
    /// Uncached list query with arbitrary filter parameters.
    async fn query_products(
        &self,
        params: Vec<(String, String)>,
    ) -> Result<Page<ProductSummary>, CatalogApiError> {
        let url = self.products_url(&params)?;
        self.get_json(url).await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
