//! Variant resolution over attribute selections.
//!
//! A product with variants exposes a list of selectable attributes (in display
//! order) and a list of SKU variants, each assigning one value per attribute.
//! Given the shopper's partial [`Selection`], the [`VariantResolver`] answers:
//!
//! - which values are still selectable for each attribute
//!   ([`VariantResolver::allowed_values`]),
//! - which selected values have become impossible and must be dropped
//!   ([`VariantResolver::reconcile`]),
//! - which variant, if any, the selection identifies
//!   ([`VariantResolver::matched_variant`]),
//! - what price to show ([`VariantResolver::price_display`]).
//!
//! Only *eligible* variants (in stock) take part in any of this. Out-of-stock
//! combinations are never offered, not even partially.
//!
//! # Example
//!
//! ```rust
//! use optika_core::{AttributeId, AttributeValueId, Product, Selection, VariantId, VariantResolver};
//!
//! # fn product() -> Product {
//! #     serde_json::from_value(serde_json::json!({
//! #         "id": 1, "name": "Frame", "slug": "frame", "price": "100",
//! #         "available_attributes": [{"id": 1, "name": "Color",
//! #             "values": [{"id": 10, "value": "Red"}, {"id": 11, "value": "Blue"}]}],
//! #         "variants": [{"id": 5, "price": "100", "stock": 3,
//! #             "attribute_values": [{"attribute_id": 1, "id": 10, "value": "Red"}]}]
//! #     })).unwrap()
//! # }
//! let product = product();
//! let resolver = VariantResolver::new(&product);
//!
//! let mut selection = Selection::new();
//! selection.select(AttributeId::new(1), AttributeValueId::new(10));
//! resolver.reconcile(&mut selection);
//!
//! assert_eq!(resolver.matched_variant(&selection).map(|v| v.id), Some(VariantId::new(5)));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{AttributeId, AttributeValueId, Price, Product, Variant};

// =============================================================================
// Selection
// =============================================================================

/// The shopper's current choice of attribute values, partial or complete.
///
/// Selections are transient page state and are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeMap<AttributeId, AttributeValueId>);

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose `value` for `attribute`, replacing any previous choice.
    pub fn select(&mut self, attribute: AttributeId, value: AttributeValueId) {
        self.0.insert(attribute, value);
    }

    /// Apply a raw value ID as it arrives from a form control.
    ///
    /// Empty, non-numeric and zero values clear the attribute instead.
    pub fn select_raw(&mut self, attribute: AttributeId, raw: Option<&str>) {
        let parsed = raw
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|id| *id != 0);

        match parsed {
            Some(id) => self.select(attribute, AttributeValueId::new(id)),
            None => {
                self.clear(attribute);
            }
        }
    }

    /// Remove the choice for `attribute`, if any.
    pub fn clear(&mut self, attribute: AttributeId) -> Option<AttributeValueId> {
        self.0.remove(&attribute)
    }

    /// Drop every choice.
    pub fn reset(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn get(&self, attribute: AttributeId) -> Option<AttributeValueId> {
        self.0.get(&attribute).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeId, AttributeValueId)> + '_ {
        self.0.iter().map(|(a, v)| (*a, *v))
    }
}

impl FromIterator<(AttributeId, AttributeValueId)> for Selection {
    fn from_iter<I: IntoIterator<Item = (AttributeId, AttributeValueId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Resolution results
// =============================================================================

/// Still-selectable values per attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedValues(BTreeMap<AttributeId, BTreeSet<AttributeValueId>>);

impl AllowedValues {
    /// Allowed values for `attribute`; empty for unknown attributes.
    #[must_use]
    pub fn get(&self, attribute: AttributeId) -> Option<&BTreeSet<AttributeValueId>> {
        self.0.get(&attribute)
    }

    #[must_use]
    pub fn contains(&self, attribute: AttributeId, value: AttributeValueId) -> bool {
        self.0.get(&attribute).is_some_and(|set| set.contains(&value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeId, &BTreeSet<AttributeValueId>)> {
        self.0.iter().map(|(a, set)| (*a, set))
    }
}

/// What price to show for the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDisplay {
    /// A variant is matched; its prices are authoritative.
    Variant {
        price: Price,
        old_price: Option<Price>,
    },
    /// Incomplete selection on a variant product with differing prices.
    Range { min: Price, max: Price },
    /// Product-level price.
    Product {
        price: Price,
        old_price: Option<Price>,
    },
}

impl PriceDisplay {
    /// The single price to charge, if there is one.
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        match self {
            Self::Variant { price, .. } | Self::Product { price, .. } => Some(*price),
            Self::Range { .. } => None,
        }
    }

    #[must_use]
    pub const fn old_price(&self) -> Option<Price> {
        match self {
            Self::Variant { old_price, .. } | Self::Product { old_price, .. } => *old_price,
            Self::Range { .. } => None,
        }
    }
}

/// Everything the product page needs for one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub allowed: AllowedValues,
    pub complete: bool,
    pub matched: Option<&'a Variant>,
    pub price: PriceDisplay,
}

// =============================================================================
// Resolver
// =============================================================================

struct EligibleVariant<'a> {
    variant: &'a Variant,
    values: HashMap<AttributeId, AttributeValueId>,
}

impl EligibleVariant<'_> {
    fn value(&self, attribute: AttributeId) -> Option<AttributeValueId> {
        self.values.get(&attribute).copied()
    }

    /// Agrees with `selection` on every selected attribute in `order` except `skip`.
    fn agrees_except(
        &self,
        order: &[AttributeId],
        selection: &Selection,
        skip: Option<AttributeId>,
    ) -> bool {
        order
            .iter()
            .filter(|attr| Some(**attr) != skip)
            .all(|attr| match selection.get(*attr) {
                Some(selected) => self.value(*attr) == Some(selected),
                None => true,
            })
    }
}

/// Resolves selections against one product's variants.
///
/// Build one per product view; it borrows the product and indexes its
/// eligible variants once.
pub struct VariantResolver<'a> {
    product: &'a Product,
    order: Vec<AttributeId>,
    has_variants: bool,
    eligible: Vec<EligibleVariant<'a>>,
}

impl<'a> VariantResolver<'a> {
    #[must_use]
    pub fn new(product: &'a Product) -> Self {
        let order: Vec<AttributeId> = product.available_attributes.iter().map(|a| a.id).collect();
        let has_variants = !product.variants.is_empty() && !order.is_empty();

        let eligible = if has_variants {
            product
                .variants
                .iter()
                .filter(|v| v.is_eligible())
                .map(|variant| EligibleVariant {
                    variant,
                    values: variant
                        .attribute_values
                        .iter()
                        .map(|av| (av.attribute_id, av.id))
                        .collect(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            product,
            order,
            has_variants,
            eligible,
        }
    }

    #[must_use]
    pub const fn product(&self) -> &'a Product {
        self.product
    }

    /// Attribute IDs in display order.
    #[must_use]
    pub fn attribute_order(&self) -> &[AttributeId] {
        &self.order
    }

    /// Whether the product is sold as variants rather than as a simple product.
    #[must_use]
    pub const fn has_variants(&self) -> bool {
        self.has_variants
    }

    /// Whether any variant is in stock.
    #[must_use]
    pub fn has_eligible_variants(&self) -> bool {
        !self.eligible.is_empty()
    }

    /// Values still selectable for each attribute under `selection`.
    ///
    /// A value of attribute `A` is allowed when some eligible variant carries
    /// it and agrees with the selection on every attribute other than `A`.
    #[must_use]
    pub fn allowed_values(&self, selection: &Selection) -> AllowedValues {
        let mut allowed: BTreeMap<AttributeId, BTreeSet<AttributeValueId>> = self
            .order
            .iter()
            .map(|attr| (*attr, BTreeSet::new()))
            .collect();

        for candidate in &self.eligible {
            for attr in &self.order {
                if !candidate.agrees_except(&self.order, selection, Some(*attr)) {
                    continue;
                }
                if let (Some(value), Some(set)) = (candidate.value(*attr), allowed.get_mut(attr)) {
                    set.insert(value);
                }
            }
        }

        AllowedValues(allowed)
    }

    /// Drop selected values that are no longer allowed.
    ///
    /// Returns the dropped `(attribute, value)` pairs. Choices for attributes
    /// this product does not offer are dropped as well. Afterwards every
    /// remaining choice is in its attribute's allowed set.
    pub fn reconcile(&self, selection: &mut Selection) -> Vec<(AttributeId, AttributeValueId)> {
        let mut dropped = Vec::new();

        loop {
            let allowed = self.allowed_values(selection);
            let invalid: Vec<_> = selection
                .iter()
                .filter(|(attr, value)| !allowed.contains(*attr, *value))
                .collect();

            if invalid.is_empty() {
                return dropped;
            }
            for (attr, value) in invalid {
                selection.clear(attr);
                dropped.push((attr, value));
            }
        }
    }

    /// Whether every attribute has a chosen value.
    ///
    /// Simple products are always complete.
    #[must_use]
    pub fn is_complete(&self, selection: &Selection) -> bool {
        if !self.has_variants() {
            return true;
        }
        self.order.iter().all(|attr| selection.get(*attr).is_some())
    }

    /// The eligible variant that exactly matches a complete selection.
    #[must_use]
    pub fn matched_variant(&self, selection: &Selection) -> Option<&'a Variant> {
        if !self.has_variants() || !self.is_complete(selection) {
            return None;
        }

        self.eligible
            .iter()
            .find(|candidate| {
                self.order
                    .iter()
                    .all(|attr| candidate.value(*attr) == selection.get(*attr))
            })
            .map(|candidate| candidate.variant)
    }

    /// Min/max price across in-stock variants, when they differ.
    #[must_use]
    pub fn price_range(&self) -> Option<(Price, Price)> {
        if !self.has_variants() {
            return None;
        }

        let prices = self
            .eligible
            .iter()
            .map(|c| c.variant.price.unwrap_or(self.product.price));
        let min = prices.clone().min()?;
        let max = prices.max()?;

        (min != max).then_some((min, max))
    }

    /// Price to show for `selection`.
    #[must_use]
    pub fn price_display(&self, selection: &Selection) -> PriceDisplay {
        if let Some(variant) = self.matched_variant(selection) {
            return PriceDisplay::Variant {
                price: variant.price.unwrap_or(self.product.price),
                old_price: variant.old_price.or(self.product.old_price),
            };
        }

        if let Some((min, max)) = self.price_range() {
            return PriceDisplay::Range { min, max };
        }

        PriceDisplay::Product {
            price: self.product.price,
            old_price: self.product.old_price,
        }
    }

    /// Resolve everything for `selection` in one pass.
    #[must_use]
    pub fn resolve(&self, selection: &Selection) -> Resolution<'a> {
        Resolution {
            allowed: self.allowed_values(selection),
            complete: self.is_complete(selection),
            matched: self.matched_variant(selection),
            price: self.price_display(selection),
        }
    }
}

/// Human-readable label for a variant, e.g. `"Color: Red, Size: M"`.
#[must_use]
pub fn variant_label(variant: &Variant) -> Option<String> {
    if variant.attribute_values.is_empty() {
        return None;
    }

    Some(
        variant
            .attribute_values
            .iter()
            .map(|av| format!("{}: {}", av.attribute_name, av.value))
            .collect::<Vec<_>>()
            .join(", "),
    )
}
