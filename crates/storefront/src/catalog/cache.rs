//! Cache types for catalog API responses.

use optika_core::{Page, Product, ProductSummary};

/// Cache key for product detail and list pages.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(String),
    Products { page: u32, page_size: u32 },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Page<ProductSummary>),
}
