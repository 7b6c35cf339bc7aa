//! Per-product page state.
//!
//! A [`ProductView`] owns the product being viewed and the shopper's current
//! selection. Every change to the selection is reconciled immediately, so the
//! selection is always consistent with what is in stock. Viewing another
//! product means building a new view, which starts with an empty selection.

use crate::cart::{Cart, CartItem};
use crate::types::{AttributeId, AttributeValueId, Product};
use crate::variants::{self, Resolution, Selection, VariantResolver};

/// Availability message shown next to the add-to-cart button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockState {
    /// Variant product without a matched variant yet.
    SelectParameters,
    /// Nothing can be bought.
    NoStock,
    /// Ready to add to the cart.
    Available,
}

/// The product page: product data plus the current selection.
#[derive(Debug, Clone)]
pub struct ProductView {
    product: Product,
    selection: Selection,
}

impl ProductView {
    /// Start viewing `product` with nothing selected.
    #[must_use]
    pub fn new(product: Product) -> Self {
        Self {
            product,
            selection: Selection::new(),
        }
    }

    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.product
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn resolver(&self) -> VariantResolver<'_> {
        VariantResolver::new(&self.product)
    }

    /// Choose a value and reconcile. Returns the choices dropped as a result.
    pub fn select(
        &mut self,
        attribute: AttributeId,
        value: AttributeValueId,
    ) -> Vec<(AttributeId, AttributeValueId)> {
        self.selection.select(attribute, value);
        self.reconcile()
    }

    /// Apply a raw form value and reconcile.
    pub fn select_raw(
        &mut self,
        attribute: AttributeId,
        raw: Option<&str>,
    ) -> Vec<(AttributeId, AttributeValueId)> {
        self.selection.select_raw(attribute, raw);
        self.reconcile()
    }

    /// Clear one attribute's choice.
    pub fn clear(&mut self, attribute: AttributeId) {
        self.selection.clear(attribute);
        self.reconcile();
    }

    /// Clear every choice.
    pub fn reset(&mut self) {
        self.selection.reset();
    }

    fn reconcile(&mut self) -> Vec<(AttributeId, AttributeValueId)> {
        let resolver = VariantResolver::new(&self.product);
        resolver.reconcile(&mut self.selection)
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution<'_> {
        self.resolver().resolve(&self.selection)
    }

    #[must_use]
    pub fn stock_state(&self) -> StockState {
        let resolver = self.resolver();

        if resolver.has_variants() {
            if !resolver.has_eligible_variants() {
                StockState::NoStock
            } else if resolver.matched_variant(&self.selection).is_some() {
                StockState::Available
            } else {
                StockState::SelectParameters
            }
        } else if self.product.stock.is_some_and(|stock| stock <= 0) {
            StockState::NoStock
        } else {
            StockState::Available
        }
    }

    #[must_use]
    pub fn can_add_to_cart(&self) -> bool {
        self.stock_state() == StockState::Available
    }

    /// The cart payload for the current selection, if it can be bought.
    ///
    /// Price and old price are captured from the current price display.
    #[must_use]
    pub fn cart_item(&self) -> Option<CartItem> {
        if !self.can_add_to_cart() {
            return None;
        }

        let resolver = self.resolver();
        let matched = resolver.matched_variant(&self.selection);
        let display = resolver.price_display(&self.selection);

        Some(CartItem {
            product_id: self.product.id,
            variant_id: matched.map(|v| v.id),
            variant_label: matched.and_then(variants::variant_label),
            slug: Some(self.product.slug.clone()),
            name: self.product.name.clone(),
            price: display.price().unwrap_or(self.product.price),
            old_price: display.old_price(),
            image: self.product.image_url().map(str::to_string),
        })
    }

    /// Whether what is currently selected is already in `cart`.
    ///
    /// Variant products without a matched variant are never "in the cart".
    #[must_use]
    pub fn is_in_cart(&self, cart: &Cart) -> bool {
        let resolver = self.resolver();
        if resolver.has_variants() {
            resolver
                .matched_variant(&self.selection)
                .is_some_and(|variant| cart.is_in_cart(self.product.id, Some(variant.id)))
        } else {
            cart.is_in_cart(self.product.id, None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{Price, ProductId, VariantId};

    fn lens_product() -> Product {
        serde_json::from_value(json!({
            "id": 40, "name": "Acuvue Oasys", "slug": "acuvue-oasys", "price": "1800",
            "main_image_url": "https://cdn.example/oasys.jpg",
            "available_attributes": [
                {"id": 1, "name": "Diopter", "values": [{"id": 10, "value": "-1.00"}, {"id": 11, "value": "-1.25"}]},
                {"id": 2, "name": "Base curve", "values": [{"id": 20, "value": "8.4"}, {"id": 21, "value": "8.8"}]}
            ],
            "variants": [
                {"id": 401, "price": "1800", "stock": 3, "attribute_values": [
                    {"attribute_id": 1, "id": 10, "value": "-1.00", "attribute_name": "Diopter"},
                    {"attribute_id": 2, "id": 20, "value": "8.4", "attribute_name": "Base curve"}]},
                {"id": 402, "price": "1900", "old_price": "2100", "stock": 1, "attribute_values": [
                    {"attribute_id": 1, "id": 11, "value": "-1.25", "attribute_name": "Diopter"},
                    {"attribute_id": 2, "id": 21, "value": "8.8", "attribute_name": "Base curve"}]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_new_view_starts_unselected() {
        let view = ProductView::new(lens_product());
        assert!(view.selection().is_empty());
        assert_eq!(view.stock_state(), StockState::SelectParameters);
        assert!(view.cart_item().is_none());
    }

    #[test]
    fn test_select_reconciles_immediately() {
        let mut view = ProductView::new(lens_product());
        view.select(AttributeId::new(1), AttributeValueId::new(10));
        let dropped = view.select(AttributeId::new(2), AttributeValueId::new(21));
        assert!(!dropped.is_empty());
        let resolution = view.resolution();
        for (attr, value) in view.selection().iter() {
            assert!(resolution.allowed.contains(attr, value));
        }
    }

    #[test]
    fn test_cart_item_for_matched_variant() {
        let mut view = ProductView::new(lens_product());
        view.select(AttributeId::new(1), AttributeValueId::new(11));
        view.select(AttributeId::new(2), AttributeValueId::new(21));

        assert_eq!(view.stock_state(), StockState::Available);
        let item = view.cart_item().unwrap();
        assert_eq!(item.product_id, ProductId::new(40));
        assert_eq!(item.variant_id, Some(VariantId::new(402)));
        assert_eq!(item.variant_label.as_deref(), Some("Diopter: -1.25, Base curve: 8.8"));
        assert_eq!(item.price, Price::from(1_900));
        assert_eq!(item.old_price, Some(Price::from(2_100)));
        assert_eq!(item.image.as_deref(), Some("https://cdn.example/oasys.jpg"));

        let mut cart = Cart::new();
        assert!(!view.is_in_cart(&cart));
        cart.add(item, 1);
        assert!(view.is_in_cart(&cart));

        view.reset();
        assert!(!view.is_in_cart(&cart));
    }

    #[test]
    fn test_sold_out_variant_product() {
        let mut product = lens_product();
        for variant in &mut product.variants {
            variant.stock = 0;
        }
        let view = ProductView::new(product);
        assert_eq!(view.stock_state(), StockState::NoStock);
        assert!(!view.can_add_to_cart());
    }

    #[test]
    fn test_simple_product() {
        let product: Product = serde_json::from_value(json!({
            "id": 7, "name": "Spray", "slug": "spray", "price": "100", "main_image_url": ""
        }))
        .unwrap();
        let view = ProductView::new(product);
        assert_eq!(view.stock_state(), StockState::Available);

        let item = view.cart_item().unwrap();
        assert_eq!(item.variant_id, None);
        assert_eq!(item.image, None);

        let mut cart = Cart::new();
        cart.add(item, 1);
        assert!(view.is_in_cart(&cart));
    }

    #[test]
    fn test_simple_product_reported_out_of_stock() {
        let product: Product = serde_json::from_value(json!({
            "id": 8, "name": "Case", "slug": "case", "price": "300", "stock": 0
        }))
        .unwrap();
        assert_eq!(ProductView::new(product).stock_state(), StockState::NoStock);
    }
}
