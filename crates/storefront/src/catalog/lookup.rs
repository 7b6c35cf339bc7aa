//! Looking up a set of products by ID.
//!
//! The catalog API may or may not support filtering by ID, so the lookup
//! tries, in order:
//!
//! 1. a bulk `ids=1,2,3` filter
//! 2. one `id=N` filter per product
//! 3. scanning every list page
//!
//! A filter counts as unsupported when the request fails or when the response
//! contains products that were not asked for (a server that ignores unknown
//! query parameters returns the plain list). Only failures of the final scan
//! reach the caller.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use optika_core::{Page, ProductId, ProductSummary};
use tracing::debug;

use super::CatalogApiError;

/// Largest page size the catalog API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Anything that can answer a product list query.
pub trait ProductSource {
    fn query_products(
        &self,
        params: Vec<(String, String)>,
    ) -> impl Future<Output = Result<Page<ProductSummary>, CatalogApiError>> + Send;
}

/// Fetch the summaries for `ids`, in the order the IDs were given.
///
/// Duplicate IDs are looked up once. IDs the catalog does not know are
/// silently absent from the result.
///
/// # Errors
///
/// Returns the error of the page scan if every filter strategy was
/// unsupported and the scan itself failed.
pub async fn fetch_products_by_ids<S>(
    source: &S,
    ids: &[ProductId],
) -> Result<Vec<ProductSummary>, CatalogApiError>
where
    S: ProductSource + Sync,
{
    let mut wanted = Vec::with_capacity(ids.len());
    let mut seen = HashSet::new();
    for id in ids {
        if seen.insert(*id) {
            wanted.push(*id);
        }
    }
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let mut found: HashMap<ProductId, ProductSummary> = HashMap::new();

    if !by_bulk_filter(source, &wanted, &mut found).await
        && !by_single_filter(source, &wanted, &mut found).await
    {
        by_page_scan(source, &wanted, &mut found).await?;
    }

    Ok(wanted.iter().filter_map(|id| found.remove(id)).collect())
}

/// Strategy 1. Returns whether the filter is supported.
async fn by_bulk_filter<S: ProductSource + Sync>(
    source: &S,
    wanted: &[ProductId],
    found: &mut HashMap<ProductId, ProductSummary>,
) -> bool {
    for chunk in wanted.chunks(MAX_PAGE_SIZE as usize) {
        let ids = chunk
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let params = vec![
            ("ids".to_string(), ids),
            ("page_size".to_string(), MAX_PAGE_SIZE.to_string()),
        ];

        match source.query_products(params).await {
            Ok(page) if only_requested(&page.results, chunk) => collect(page.results, found),
            Ok(_) => {
                debug!("Bulk id filter ignored by the API");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "Bulk id filter failed");
                return false;
            }
        }
    }
    true
}

/// Strategy 2. Returns whether the filter is supported.
async fn by_single_filter<S: ProductSource + Sync>(
    source: &S,
    wanted: &[ProductId],
    found: &mut HashMap<ProductId, ProductSummary>,
) -> bool {
    let remaining: Vec<ProductId> = wanted
        .iter()
        .filter(|id| !found.contains_key(id))
        .copied()
        .collect();

    for id in remaining {
        let params = vec![("id".to_string(), id.to_string())];

        match source.query_products(params).await {
            Ok(page) if only_requested(&page.results, &[id]) => {
                collect(page.results, found);
            }
            Ok(_) => {
                debug!("Single id filter ignored by the API");
                return false;
            }
            Err(e) => {
                debug!(error = %e, %id, "Single id filter failed");
                return false;
            }
        }
    }
    true
}

/// Strategy 3. Walks pages until every ID is found or the list ends.
async fn by_page_scan<S: ProductSource + Sync>(
    source: &S,
    wanted: &[ProductId],
    found: &mut HashMap<ProductId, ProductSummary>,
) -> Result<(), CatalogApiError> {
    let wanted_set: HashSet<ProductId> = wanted.iter().copied().collect();
    let mut page_number: u32 = 1;

    loop {
        let params = vec![
            ("page".to_string(), page_number.to_string()),
            ("page_size".to_string(), MAX_PAGE_SIZE.to_string()),
        ];
        let page = source.query_products(params).await?;
        let has_next = page.has_next();

        collect(
            page.results
                .into_iter()
                .filter(|p| wanted_set.contains(&p.id)),
            found,
        );

        if !has_next || wanted_set.iter().all(|id| found.contains_key(id)) {
            debug!(pages = page_number, "Page scan finished");
            return Ok(());
        }
        page_number = page_number.saturating_add(1);
    }
}

fn only_requested(results: &[ProductSummary], requested: &[ProductId]) -> bool {
    results.iter().all(|p| requested.contains(&p.id))
}

fn collect(
    products: impl IntoIterator<Item = ProductSummary>,
    found: &mut HashMap<ProductId, ProductSummary>,
) {
    for product in products {
        found.entry(product.id).or_insert(product);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use optika_core::Price;

    use super::*;

    /// How the fake API treats id filters.
    #[derive(Clone, Copy)]
    enum Filters {
        Bulk,
        SingleOnly,
        Ignored,
        Failing,
    }

    struct FakeCatalog {
        products: Vec<ProductSummary>,
        filters: Filters,
        page_size: usize,
        requests: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl FakeCatalog {
        fn new(count: i64, filters: Filters) -> Self {
            Self {
                products: (1..=count).map(summary).collect(),
                filters,
                page_size: 3,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn respond(&self, params: &[(String, String)]) -> Result<Page<ProductSummary>, CatalogApiError> {
            let get = |name: &str| {
                params
                    .iter()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.clone())
            };
            let filtered = |ids: Vec<i64>| Page {
                count: ids.len() as u64,
                next: None,
                previous: None,
                results: self
                    .products
                    .iter()
                    .filter(|p| ids.contains(&p.id.as_i64()))
                    .cloned()
                    .collect(),
            };

            match (self.filters, get("ids"), get("id")) {
                (Filters::Failing, Some(_), _) | (Filters::Failing, _, Some(_)) => {
                    return Err(CatalogApiError::Status {
                        status: 400,
                        body: "bad filter".to_string(),
                    });
                }
                (Filters::Bulk, Some(ids), _) => {
                    return Ok(filtered(ids.split(',').map(|s| s.parse().unwrap()).collect()));
                }
                (Filters::Bulk | Filters::SingleOnly, _, Some(id)) => {
                    return Ok(filtered(vec![id.parse().unwrap()]));
                }
                _ => {}
            }

            let page: usize = get("page").map_or(1, |p| p.parse().unwrap());
            let start = (page - 1) * self.page_size;
            let results: Vec<_> = self
                .products
                .iter()
                .skip(start)
                .take(self.page_size)
                .cloned()
                .collect();
            let next = (start + self.page_size < self.products.len())
                .then(|| format!("?page={}", page + 1));
            Ok(Page {
                count: self.products.len() as u64,
                next,
                previous: None,
                results,
            })
        }
    }

    impl ProductSource for FakeCatalog {
        async fn query_products(
            &self,
            params: Vec<(String, String)>,
        ) -> Result<Page<ProductSummary>, CatalogApiError> {
            self.requests.lock().unwrap().push(params.clone());
            self.respond(&params)
        }
    }

    fn summary(id: i64) -> ProductSummary {
        ProductSummary {
            id: ProductId::new(id),
            name: format!("Frame {id}"),
            slug: format!("frame-{id}"),
            price: Price::from(1_000 + id),
            old_price: None,
            main_image_url: None,
            has_variations: false,
            price_range: None,
        }
    }

    fn ids(raw: &[i64]) -> Vec<ProductId> {
        raw.iter().copied().map(ProductId::new).collect()
    }

    fn result_ids(products: &[ProductSummary]) -> Vec<i64> {
        products.iter().map(|p| p.id.as_i64()).collect()
    }

    #[tokio::test]
    async fn test_bulk_filter_preserves_requested_order() {
        let api = FakeCatalog::new(10, Filters::Bulk);
        let products = fetch_products_by_ids(&api, &ids(&[7, 2, 7, 5])).await.unwrap();
        assert_eq!(result_ids(&products), vec![7, 2, 5]);
        assert_eq!(api.request_count(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_single_filter() {
        let api = FakeCatalog::new(10, Filters::SingleOnly);
        let products = fetch_products_by_ids(&api, &ids(&[4, 9])).await.unwrap();
        assert_eq!(result_ids(&products), vec![4, 9]);
        // One ignored bulk request, then one per id.
        assert_eq!(api.request_count(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_page_scan() {
        let api = FakeCatalog::new(10, Filters::Ignored);
        let products = fetch_products_by_ids(&api, &ids(&[8, 1])).await.unwrap();
        assert_eq!(result_ids(&products), vec![8, 1]);
    }

    #[tokio::test]
    async fn test_page_scan_stops_when_all_found() {
        let api = FakeCatalog::new(30, Filters::Failing);
        let products = fetch_products_by_ids(&api, &ids(&[2, 5])).await.unwrap();
        assert_eq!(result_ids(&products), vec![2, 5]);
        // Failed bulk, failed single, then pages 1 and 2 of 3-item pages.
        assert_eq!(api.request_count(), 4);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_absent() {
        let api = FakeCatalog::new(4, Filters::Ignored);
        let products = fetch_products_by_ids(&api, &ids(&[3, 99])).await.unwrap();
        assert_eq!(result_ids(&products), vec![3]);
    }

    #[tokio::test]
    async fn test_empty_request_makes_no_calls() {
        let api = FakeCatalog::new(4, Filters::Bulk);
        assert!(fetch_products_by_ids(&api, &[]).await.unwrap().is_empty());
        assert_eq!(api.request_count(), 0);
    }
}
