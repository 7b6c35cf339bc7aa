//! Cart commands.

use std::fmt::Write as _;

use optika_core::{CartLine, CartLineKey, CartSummary, Price};
use optika_storefront::{AppError, CartStore};

pub fn list(cart: &CartStore, json: bool) -> Result<(), AppError> {
    let output = if json {
        super::to_json(&cart.snapshot())?
    } else {
        render(&cart.lines(), &cart.summary(Price::ZERO, Price::ZERO))
    };
    super::emit(&output);
    Ok(())
}

pub fn update(cart: &CartStore, key: &str, quantity: i64) -> Result<(), AppError> {
    let key = existing_key(cart, key)?;
    cart.update_quantity(&key, quantity);
    if quantity <= 0 {
        super::emit(&format!("Removed {key}"));
    } else {
        super::emit(&format!("Set {key} to {quantity}"));
    }
    Ok(())
}

pub fn remove(cart: &CartStore, key: &str) -> Result<(), AppError> {
    let key = existing_key(cart, key)?;
    cart.remove_from_cart(&key);
    super::emit(&format!("Removed {key}"));
    Ok(())
}

pub fn clear(cart: &CartStore) -> Result<(), AppError> {
    if cart.clear_cart() {
        tracing::info!("Cart cleared");
    }
    super::emit("Cart is empty");
    Ok(())
}

fn existing_key(cart: &CartStore, raw: &str) -> Result<CartLineKey, AppError> {
    let key = CartLineKey::from(raw.trim());
    if cart.snapshot().get(&key).is_none() {
        return Err(AppError::NotFound(format!("cart line {key}")));
    }
    Ok(key)
}

/// Text rendering of the cart.
pub fn render(lines: &[CartLine], summary: &CartSummary) -> String {
    if lines.is_empty() {
        return "Cart is empty".to_string();
    }

    let mut out = String::new();
    for line in lines {
        let _ = write!(out, "{:<10} {}", line.key.as_str(), line.name);
        if let Some(label) = &line.variant_label {
            let _ = write!(out, " ({label})");
        }
        let _ = writeln!(
            out,
            "  {} x {} = {}",
            line.quantity,
            line.price.display(),
            line.line_total().display()
        );
    }

    let _ = write!(
        out,
        "Items: {}\nTotal: {}",
        summary.total_items,
        summary.grand_total.display()
    );
    if !summary.savings.is_zero() {
        let _ = write!(out, "\nYou save: {}", summary.savings.display());
    }
    out
}
