//! Catalog data model as returned by the upstream catalog API.
//!
//! These are the typed shapes of the product detail and product list
//! payloads. Parsing happens through `serde`; structural checks that serde
//! cannot express live in [`Product::validate`], which callers run once at
//! the ingestion boundary.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::id::{AttributeId, AttributeValueId, ProductId, VariantId};
use super::price::Price;

/// Structural problems in a catalog payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A variant assigns more than one value to the same attribute.
    #[error("variant {variant} assigns attribute {attribute} more than once")]
    DuplicateAttribute {
        variant: VariantId,
        attribute: AttributeId,
    },

    /// The same attribute appears twice in the selectable attribute list.
    #[error("attribute {0} is defined more than once")]
    DuplicateAttributeDefinition(AttributeId),

    /// A product or variant carries a negative price.
    #[error("negative price on {0}")]
    NegativePrice(String),
}

// =============================================================================
// Attributes
// =============================================================================

/// One selectable value of an attribute (e.g., "Red").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub id: AttributeValueId,
    pub value: String,
    #[serde(default)]
    pub slug: String,
}

/// A selectable product dimension (e.g., "Color").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    /// Look up one of this attribute's values by ID.
    #[must_use]
    pub fn value(&self, id: AttributeValueId) -> Option<&AttributeValue> {
        self.values.iter().find(|v| v.id == id)
    }
}

// =============================================================================
// Variants
// =============================================================================

/// The value a variant assigns to one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAttributeValue {
    pub attribute_id: AttributeId,
    /// ID of the attribute value (not of the assignment).
    pub id: AttributeValueId,
    pub value: String,
    #[serde(default)]
    pub attribute_name: String,
    #[serde(default)]
    pub attribute_slug: Option<String>,
}

/// One purchasable SKU of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default)]
    pub sku: Option<String>,
    /// Variant price; `None` means the product price applies.
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub old_price: Option<Price>,
    /// Units in stock. Missing or null stock is read as zero.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub stock: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub attribute_values: Vec<VariantAttributeValue>,
}

impl Variant {
    /// Whether this variant can be selected at all: active and in stock.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.is_active && self.stock > 0
    }

    /// The value this variant assigns to `attribute`, if any.
    #[must_use]
    pub fn value_for(&self, attribute: AttributeId) -> Option<AttributeValueId> {
        self.attribute_values
            .iter()
            .find(|av| av.attribute_id == attribute)
            .map(|av| av.id)
    }
}

// =============================================================================
// Products
// =============================================================================

/// Product detail payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Price,
    #[serde(default)]
    pub old_price: Option<Price>,
    /// Top-level stock for simple products, when the API reports it.
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub main_image_url: Option<String>,
    /// Selectable attributes in display order.
    #[serde(default)]
    pub available_attributes: Vec<Attribute>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// Check structural invariants the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.price.is_negative() {
            return Err(CatalogError::NegativePrice(format!("product {}", self.id)));
        }
        if self.old_price.is_some_and(|p| p.is_negative()) {
            return Err(CatalogError::NegativePrice(format!("product {}", self.id)));
        }

        let mut seen = HashSet::new();
        for attribute in &self.available_attributes {
            if !seen.insert(attribute.id) {
                return Err(CatalogError::DuplicateAttributeDefinition(attribute.id));
            }
        }

        for variant in &self.variants {
            let negative = variant.price.is_some_and(|p| p.is_negative())
                || variant.old_price.is_some_and(|p| p.is_negative());
            if negative {
                return Err(CatalogError::NegativePrice(format!("variant {}", variant.id)));
            }

            let mut assigned = HashSet::new();
            for av in &variant.attribute_values {
                if !assigned.insert(av.attribute_id) {
                    return Err(CatalogError::DuplicateAttribute {
                        variant: variant.id,
                        attribute: av.attribute_id,
                    });
                }
            }
        }

        Ok(())
    }

    /// Main image URL, treating the API's empty string as absent.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.main_image_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Look up a selectable attribute by ID.
    #[must_use]
    pub fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.available_attributes.iter().find(|a| a.id == id)
    }

    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

/// Min/max price pair as reported in product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: Price,
    pub max: Price,
}

/// Product list entry (catalog grids, favorites page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Price,
    #[serde(default)]
    pub old_price: Option<Price>,
    #[serde(default)]
    pub main_image_url: Option<String>,
    #[serde(default)]
    pub has_variations: bool,
    #[serde(default)]
    pub price_range: Option<PriceBounds>,
}

/// Page-number pagination envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

const fn default_true() -> bool {
    true
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}
