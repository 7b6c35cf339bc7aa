//! Product browsing and variant selection.

use std::fmt::Write as _;
use std::str::FromStr;

use optika_core::variants::variant_label;
use optika_core::{
    Attribute, AttributeId, AttributeValue, AttributeValueId, PriceDisplay, Product, ProductView,
    StockState,
};
use optika_storefront::error::add_breadcrumb;
use optika_storefront::{AppError, CartStore, CatalogClient};

/// One `attribute=value` choice from the command line.
///
/// An empty value clears the attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectArg {
    pub attribute: String,
    pub value: String,
}

impl FromStr for SelectArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (attribute, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected attribute=value, got '{s}'"))?;
        let attribute = attribute.trim();
        if attribute.is_empty() {
            return Err(format!("missing attribute in '{s}'"));
        }
        Ok(Self {
            attribute: attribute.to_string(),
            value: value.trim().to_string(),
        })
    }
}

/// Show a product and its parameters.
pub async fn show(client: &CatalogClient, slug: &str) -> Result<(), AppError> {
    let product = client.get_product(slug).await?;
    super::emit(&render(&ProductView::new(product)));
    Ok(())
}

/// Resolve a selection and show the result.
pub async fn resolve(
    client: &CatalogClient,
    slug: &str,
    selections: &[SelectArg],
) -> Result<(), AppError> {
    let product = client.get_product(slug).await?;
    let (view, dropped) = apply_selections(product, selections)?;

    let mut output = render(&view);
    for (attribute, value) in dropped {
        let _ = write!(
            output,
            "\nDropped unavailable choice: {}",
            describe(view.product(), attribute, value)
        );
    }
    super::emit(&output);
    Ok(())
}

/// Resolve a selection and add it to the cart.
pub async fn add(
    client: &CatalogClient,
    cart: &CartStore,
    slug: &str,
    selections: &[SelectArg],
    quantity: u32,
) -> Result<(), AppError> {
    if quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
    }

    let product = client.get_product(slug).await?;
    let (view, _) = apply_selections(product, selections)?;

    let item = view.cart_item().ok_or_else(|| match view.stock_state() {
        StockState::NoStock => AppError::BadRequest(format!("{} is out of stock", view.product().name)),
        _ => AppError::BadRequest("select all parameters first".to_string()),
    })?;

    let key = item.key();
    let name = item.name.clone();
    cart.add_to_cart(item, quantity);
    add_breadcrumb("cart", "Added to cart", Some(&[("key", key.as_str())][..]));
    tracing::info!(%key, quantity, "Added to cart");

    super::emit(&format!("Added {quantity} x {name} ({key})"));
    Ok(())
}

/// Build a view and apply each choice in order.
///
/// Returns the view and every choice that was dropped because it conflicted
/// with stock.
pub fn apply_selections(
    product: Product,
    selections: &[SelectArg],
) -> Result<(ProductView, Vec<(AttributeId, AttributeValueId)>), AppError> {
    let mut view = ProductView::new(product);
    let mut dropped = Vec::new();

    for choice in selections {
        let attribute = find_attribute(view.product(), &choice.attribute)
            .ok_or_else(|| AppError::BadRequest(format!("unknown parameter '{}'", choice.attribute)))?;
        let attribute_id = attribute.id;

        if choice.value.is_empty() {
            view.clear(attribute_id);
            continue;
        }

        let value_id = find_value(attribute, &choice.value)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "unknown value '{}' for {}",
                    choice.value, attribute.name
                ))
            })?
            .id;
        dropped.extend(view.select(attribute_id, value_id));
    }

    Ok((view, dropped))
}

/// Match by slug or name (case-insensitive), then by ID.
fn find_attribute<'a>(product: &'a Product, raw: &str) -> Option<&'a Attribute> {
    product
        .available_attributes
        .iter()
        .find(|a| matches_label(&a.name, &a.slug, raw))
        .or_else(|| {
            raw.parse::<AttributeId>()
                .ok()
                .and_then(|id| product.attribute(id))
        })
}

/// Match by value text or slug, then by ID.
fn find_value<'a>(attribute: &'a Attribute, raw: &str) -> Option<&'a AttributeValue> {
    attribute
        .values
        .iter()
        .find(|v| matches_label(&v.value, &v.slug, raw))
        .or_else(|| {
            raw.parse::<AttributeValueId>()
                .ok()
                .and_then(|id| attribute.value(id))
        })
}

fn matches_label(name: &str, slug: &str, raw: &str) -> bool {
    let raw = raw.to_lowercase();
    name.to_lowercase() == raw || (!slug.is_empty() && slug.to_lowercase() == raw)
}

fn describe(product: &Product, attribute: AttributeId, value: AttributeValueId) -> String {
    product.attribute(attribute).map_or_else(
        || format!("{attribute}={value}"),
        |a| {
            let value = a
                .value(value)
                .map_or_else(|| value.to_string(), |v| v.value.clone());
            format!("{}: {value}", a.name)
        },
    )
}

fn render_price(display: PriceDisplay) -> String {
    match display {
        PriceDisplay::Range { min, max } => format!("{} - {}", min.display(), max.display()),
        PriceDisplay::Variant { price, old_price } | PriceDisplay::Product { price, old_price } => {
            old_price.map_or_else(
                || price.display(),
                |old| format!("{} (was {})", price.display(), old.display()),
            )
        }
    }
}

/// Text rendering of a product page.
pub fn render(view: &ProductView) -> String {
    let product = view.product();
    let resolver = view.resolver();
    let resolution = view.resolution();

    let mut out = format!("{} ({})\n", product.name, product.slug);
    let _ = writeln!(out, "Price: {}", render_price(resolution.price));

    for attribute_id in resolver.attribute_order() {
        let Some(attribute) = product.attribute(*attribute_id) else {
            continue;
        };
        let selected = view.selection().get(attribute.id);
        let values = attribute
            .values
            .iter()
            .map(|v| {
                if selected == Some(v.id) {
                    format!("[{}]", v.value)
                } else if resolution.allowed.contains(attribute.id, v.id) {
                    v.value.clone()
                } else {
                    format!("({} unavailable)", v.value)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "{}: {values}", attribute.name);
    }

    if let Some(variant) = resolution.matched {
        let label = variant_label(variant).unwrap_or_default();
        let sku = variant.sku.as_deref().unwrap_or("-");
        let _ = writeln!(out, "Variant: {label} (SKU {sku}, {} in stock)", variant.stock);
    }

    let status = match view.stock_state() {
        StockState::Available => "Available",
        StockState::NoStock => "Out of stock",
        StockState::SelectParameters => "Select parameters",
    };
    let _ = write!(out, "Status: {status}");
    out
}
