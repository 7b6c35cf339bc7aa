//! Shopping cart lines keyed by product and variant.
//!
//! A cart holds at most one line per [`CartLineKey`]; quantities are always at
//! least one. Prices are captured when an item is added and never re-fetched.
//!
//! The serialized form is a JSON array of lines with camelCase field names,
//! the same shape older storefront clients persisted, so existing carts keep
//! loading. Deserialization normalizes whatever it reads: lines with a
//! quantity below one or no price are dropped and duplicate keys are merged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Price, ProductId, VariantId};

// =============================================================================
// Keys
// =============================================================================

/// Cart line key: `"{product}"` for simple products, `"{product}:{variant}"`
/// for variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLineKey(String);

impl CartLineKey {
    #[must_use]
    pub fn new(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        match variant_id {
            Some(variant) => Self(format!("{product_id}:{variant}")),
            None => Self(product_id.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartLineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CartLineKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl From<&str> for CartLineKey {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

// =============================================================================
// Lines
// =============================================================================

/// What gets added to the cart: product context captured at add time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub variant_label: Option<String>,
    pub slug: Option<String>,
    pub name: String,
    pub price: Price,
    pub old_price: Option<Price>,
    pub image: Option<String>,
}

impl CartItem {
    /// A simple-product item with just an ID, name and price.
    #[must_use]
    pub fn simple(product_id: ProductId, name: impl Into<String>, price: Price) -> Self {
        Self {
            product_id,
            variant_id: None,
            variant_label: None,
            slug: None,
            name: name.into(),
            price,
            old_price: None,
            image: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> CartLineKey {
        CartLineKey::new(self.product_id, self.variant_id)
    }
}

/// One row in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Recomputed from the product and variant IDs on load.
    #[serde(default)]
    pub key: CartLineKey,
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub variant_label: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub old_price: Option<Price>,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartLine {
    fn from_item(item: CartItem, quantity: u32) -> Self {
        Self {
            key: item.key(),
            product_id: item.product_id,
            variant_id: item.variant_id,
            variant_label: item.variant_label,
            slug: item.slug,
            name: item.name,
            price: item.price,
            old_price: item.old_price,
            quantity,
            image: item.image,
        }
    }

    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }

    /// Discount against the old price for the whole line, if any.
    #[must_use]
    pub fn savings(&self) -> Price {
        self.old_price
            .map_or(Price::ZERO, |old| old.saturating_sub(self.price) * self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Order totals for the cart summary and checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub total_items: u64,
    pub subtotal: Price,
    pub savings: Price,
    pub shipping: Price,
    pub discount: Price,
    /// `subtotal + shipping - discount`, never below zero.
    pub grand_total: Price,
}

/// The cart: ordered lines, one per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of `item`.
    ///
    /// An existing line with the same key has its quantity increased; otherwise
    /// a new line is appended. Adding zero is a no-op. Returns whether the cart
    /// changed.
    pub fn add(&mut self, item: CartItem, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }

        let key = item.key();
        if let Some(line) = self.lines.iter_mut().find(|l| l.key == key) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            self.lines.push(CartLine::from_item(item, quantity));
        }
        true
    }

    /// Set a line's quantity exactly; zero or less removes the line.
    ///
    /// Returns whether the cart changed.
    pub fn update_quantity(&mut self, key: &CartLineKey, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(key);
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        match self.lines.iter_mut().find(|l| &l.key == key) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Remove a line. Removing a missing key is a no-op.
    pub fn remove(&mut self, key: &CartLineKey) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.key != key);
        self.lines.len() != before
    }

    /// Whether the product (or the exact product/variant pair) is in the cart.
    ///
    /// Without a variant this only matches the simple-product line, never a
    /// variant line of the same product.
    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId, variant_id: Option<VariantId>) -> bool {
        self.lines
            .iter()
            .any(|l| l.product_id == product_id && l.variant_id == variant_id)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn get(&self, key: &CartLineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.key == key)
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of captured price times quantity.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Checkout totals with the given shipping cost and coupon discount.
    #[must_use]
    pub fn summary(&self, shipping: Price, discount: Price) -> CartSummary {
        let subtotal = self.total_price();
        CartSummary {
            total_items: self.total_items(),
            subtotal,
            savings: self.lines.iter().map(CartLine::savings).sum(),
            shipping,
            discount,
            grand_total: (subtotal + shipping).saturating_sub(discount),
        }
    }
}

/// A stored line as written by any client, before normalization.
///
/// Quantity is signed and price optional so one bad line cannot reject the
/// whole payload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLine {
    product_id: ProductId,
    #[serde(default)]
    variant_id: Option<VariantId>,
    #[serde(default)]
    variant_label: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    price: Option<Price>,
    #[serde(default)]
    old_price: Option<Price>,
    #[serde(default)]
    quantity: i64,
    #[serde(default)]
    image: Option<String>,
}

impl RawLine {
    /// `None` for lines without a price or with a quantity below one.
    fn into_line(self) -> Option<CartLine> {
        let price = self.price?;
        if self.quantity < 1 {
            return None;
        }
        Some(CartLine {
            key: CartLineKey::new(self.product_id, self.variant_id),
            product_id: self.product_id,
            variant_id: self.variant_id,
            variant_label: self.variant_label,
            slug: self.slug,
            name: self.name,
            price,
            old_price: self.old_price,
            quantity: u32::try_from(self.quantity).unwrap_or(u32::MAX),
            image: self.image,
        })
    }
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<RawLine>::deserialize(deserializer)?;
        let mut cart = Self::new();
        for line in raw.into_iter().filter_map(RawLine::into_line) {
            if let Some(existing) = cart.lines.iter_mut().find(|l| l.key == line.key) {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            } else {
                cart.lines.push(line);
            }
        }
        Ok(cart)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn item(product: i64, variant: Option<i64>, price: i64) -> CartItem {
        CartItem {
            variant_id: variant.map(VariantId::new),
            ..CartItem::simple(ProductId::new(product), format!("Product {product}"), Price::from(price))
        }
    }

    #[test]
    fn test_keys() {
        assert_eq!(CartLineKey::new(ProductId::new(7), None).as_str(), "7");
        assert_eq!(
            CartLineKey::new(ProductId::new(7), Some(VariantId::new(3))).as_str(),
            "7:3"
        );
    }

    #[test]
    fn test_repeated_add_merges_into_one_line() {
        let mut cart = Cart::new();
        cart.add(item(7, None, 100), 1);
        cart.add(item(7, None, 100), 2);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].product_id, ProductId::new(7));
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_variants_get_separate_lines() {
        let mut cart = Cart::new();
        cart.add(item(7, Some(1), 100), 1);
        cart.add(item(7, Some(2), 120), 1);
        cart.add(item(7, None, 90), 1);
        assert_eq!(cart.len(), 3);
    }

    #[test]
    fn test_price_captured_at_add_time() {
        let mut cart = Cart::new();
        cart.add(item(7, None, 100), 1);
        cart.add(item(7, None, 150), 1);
        assert_eq!(cart.lines()[0].price, Price::from(100));
        assert_eq!(cart.total_price(), Price::from(200));
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = Cart::new();
        assert!(!cart.add(item(1, None, 10), 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_sets_exactly() {
        let mut cart = Cart::new();
        cart.add(item(7, None, 100), 2);
        let key = CartLineKey::new(ProductId::new(7), None);

        assert!(cart.update_quantity(&key, 5));
        assert_eq!(cart.get(&key).unwrap().quantity, 5);
        assert!(!cart.update_quantity(&key, 5));
    }

    #[test]
    fn test_update_quantity_floor_removes_line() {
        for quantity in [0, -5] {
            let mut cart = Cart::new();
            cart.add(item(7, None, 100), 2);
            let key = CartLineKey::new(ProductId::new(7), None);

            assert!(cart.update_quantity(&key, quantity));
            assert!(cart.is_empty());
        }
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut cart = Cart::new();
        cart.add(item(7, None, 100), 1);
        let key = CartLineKey::from("7");
        assert!(cart.remove(&key));
        assert!(!cart.remove(&key));
        assert!(!cart.remove(&CartLineKey::from("missing")));
    }

    #[test]
    fn test_is_in_cart_distinguishes_simple_and_variant() {
        let mut cart = Cart::new();
        cart.add(item(7, Some(3), 100), 1);

        assert!(!cart.is_in_cart(ProductId::new(7), None));
        assert!(cart.is_in_cart(ProductId::new(7), Some(VariantId::new(3))));
        assert!(!cart.is_in_cart(ProductId::new(7), Some(VariantId::new(4))));

        cart.add(item(7, None, 100), 1);
        assert!(cart.is_in_cart(ProductId::new(7), None));
    }

    #[test]
    fn test_summary() {
        let mut cart = Cart::new();
        let mut discounted = item(1, None, 800);
        discounted.old_price = Some(Price::from(1000));
        cart.add(discounted, 2);
        cart.add(item(2, None, 400), 1);

        let summary = cart.summary(Price::from(300), Price::from(500));
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.subtotal, Price::from(2000));
        assert_eq!(summary.savings, Price::from(400));
        assert_eq!(summary.grand_total, Price::from(1800));

        let huge_discount = cart.summary(Price::ZERO, Price::from(10_000));
        assert_eq!(huge_discount.grand_total, Price::ZERO);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let mut cart = Cart::new();
        cart.add(item(3, None, 10), 1);
        cart.add(item(1, Some(9), 20), 4);
        cart.add(item(2, None, 30), 2);

        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }

    #[test]
    fn test_parses_legacy_payload_and_normalizes() {
        let raw = r#"[
            {"key": "7", "productId": 7, "variantId": null, "variantLabel": null,
             "slug": "lens", "name": "Lens", "price": 100, "oldPrice": null,
             "quantity": 1, "image": null},
            {"key": "stale", "productId": 7, "variantId": null, "price": 100, "quantity": 2},
            {"key": "8:1", "productId": 8, "variantId": 1, "price": 50.5, "quantity": 0},
            {"productId": 9, "price": 50, "quantity": -1},
            {"productId": 10, "price": null, "quantity": 2}
        ]"#;

        let cart: Cart = serde_json::from_str(raw).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].key.as_str(), "7");
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut cart = Cart::new();
        cart.add(item(7, Some(2), 100), 1);
        let value = serde_json::to_value(&cart).unwrap();
        assert_eq!(value[0]["productId"], 7);
        assert_eq!(value[0]["variantId"], 2);
        assert_eq!(value[0]["key"], "7:2");
    }
}
