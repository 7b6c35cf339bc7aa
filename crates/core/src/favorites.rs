//! Favorite products: an ordered, deduplicated set of product IDs.
//!
//! Serialized as a plain JSON array of IDs in first-insertion order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ProductId;

/// The favorites set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ProductId>", into = "Vec<ProductId>")]
pub struct Favorites {
    ids: Vec<ProductId>,
}

impl Favorites {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `product_id`. Returns whether it is now a favorite.
    pub fn toggle(&mut self, product_id: ProductId) -> bool {
        if self.remove(product_id) {
            false
        } else {
            self.ids.push(product_id);
            true
        }
    }

    /// Toggle using a loosely typed ID (a JSON number or numeric string).
    ///
    /// IDs that do not normalize to an integer are ignored and `None` is
    /// returned.
    pub fn toggle_raw(&mut self, raw: &Value) -> Option<bool> {
        normalize_product_id(raw).map(|id| self.toggle(id))
    }

    /// Add `product_id` unless present. Returns whether it was added.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        if self.contains(product_id) {
            return false;
        }
        self.ids.push(product_id);
        true
    }

    /// Remove `product_id`. Returns whether it was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| *id != product_id);
        self.ids.len() != before
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.ids.contains(&product_id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// IDs in first-insertion order.
    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<ProductId>> for Favorites {
    fn from(raw: Vec<ProductId>) -> Self {
        let mut favorites = Self::new();
        for id in raw {
            favorites.add(id);
        }
        favorites
    }
}

impl From<Favorites> for Vec<ProductId> {
    fn from(favorites: Favorites) -> Self {
        favorites.ids
    }
}

/// Normalize a loosely typed product ID.
///
/// Accepts integral JSON numbers and strings holding an integer. Fractional,
/// non-finite and non-numeric values yield `None`.
#[must_use]
pub fn normalize_product_id(raw: &Value) -> Option<ProductId> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral_f64))
            .map(ProductId::new),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
                .map(ProductId::new)
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)] // range-checked before the cast
fn integral_f64(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    (value.is_finite() && value.fract() == 0.0 && value.abs() <= LIMIT).then(|| value as i64)
}
