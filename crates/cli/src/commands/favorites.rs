//! Favorites commands.

use optika_core::ProductSummary;
use optika_storefront::{AppError, CatalogClient, FavoritesStore};
use serde_json::Value;

pub fn list(favorites: &FavoritesStore, json: bool) -> Result<(), AppError> {
    let ids = favorites.ids();
    let output = if json {
        super::to_json(&ids)?
    } else if ids.is_empty() {
        "No favorites".to_string()
    } else {
        ids.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    };
    super::emit(&output);
    Ok(())
}

pub fn toggle(favorites: &FavoritesStore, raw: &str) -> Result<(), AppError> {
    let now_favorite = favorites
        .toggle_favorite_raw(&Value::String(raw.to_string()))
        .ok_or_else(|| AppError::BadRequest(format!("'{raw}' is not a product ID")))?;

    let verb = if now_favorite { "Added" } else { "Removed" };
    super::emit(&format!("{verb} {}", raw.trim()));
    Ok(())
}

pub fn clear(favorites: &FavoritesStore) -> Result<(), AppError> {
    favorites.clear_favorites();
    super::emit("No favorites");
    Ok(())
}

/// Load the favorite products from the catalog, in favorites order.
pub async fn fetch(
    client: &CatalogClient,
    favorites: &FavoritesStore,
    json: bool,
) -> Result<(), AppError> {
    let ids = favorites.ids();
    let products = client.get_products_by_ids(&ids).await?;

    if products.len() < ids.len() {
        tracing::warn!(
            requested = ids.len(),
            found = products.len(),
            "Some favorite products no longer exist"
        );
    }

    let output = if json {
        super::to_json(&products)?
    } else {
        render(&products)
    };
    super::emit(&output);
    Ok(())
}

/// Text rendering of product summaries.
pub fn render(products: &[ProductSummary]) -> String {
    if products.is_empty() {
        return "No favorites".to_string();
    }

    products
        .iter()
        .map(|p| {
            let price = match (&p.price_range, &p.old_price) {
                (Some(range), _) if range.min != range.max => {
                    format!("{} - {}", range.min.display(), range.max.display())
                }
                (_, Some(old)) => format!("{} (was {})", p.price.display(), old.display()),
                _ => p.price.display(),
            };
            format!("{:<6} {} ({})  {price}", p.id.to_string(), p.name, p.slug)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use optika_core::{Price, PriceBounds, ProductId};

    use super::*;

    fn summary(id: i64, price: i64) -> ProductSummary {
        ProductSummary {
            id: ProductId::new(id),
            name: format!("Frame {id}"),
            slug: format!("frame-{id}"),
            price: Price::from(price),
            old_price: None,
            main_image_url: None,
            has_variations: false,
            price_range: None,
        }
    }

    #[test]
    fn test_render_summaries() {
        let mut ranged = summary(3, 900);
        ranged.price_range = Some(PriceBounds {
            min: Price::from(900),
            max: Price::from(1_200),
        });
        let mut discounted = summary(8, 500);
        discounted.old_price = Some(Price::from(700));

        let text = render(&[ranged, discounted, summary(1, 50)]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines.first().copied(), Some("3      Frame 3 (frame-3)  900 \u{20bd} - 1\u{a0}200 \u{20bd}"));
        assert!(text.contains("Frame 8 (frame-8)  500 \u{20bd} (was 700 \u{20bd})"));
        assert!(text.ends_with("Frame 1 (frame-1)  50 \u{20bd}"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&[]), "No favorites");
    }
}
