//! Optika Core - Storefront domain library.
//!
//! This crate provides the domain logic shared by all Optika components:
//! - `storefront` - Runtime library (persistence, cross-tab sync, catalog client)
//! - `cli` - Command-line tools for browsing products and managing the cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! persistence, no HTTP clients. Everything here is deterministic over
//! already-fetched data, which keeps it usable from anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, and the validated catalog data model
//! - [`variants`] - Variant resolution over attribute selections
//! - [`view`] - Per-product page state (selection, stock state, cart payload)
//! - [`cart`] - Cart lines keyed by product and variant
//! - [`favorites`] - Ordered, deduplicated favorite product IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod favorites;
pub mod types;
pub mod variants;
pub mod view;

pub use cart::{Cart, CartItem, CartLine, CartLineKey, CartSummary};
pub use favorites::Favorites;
pub use types::*;
pub use variants::{AllowedValues, PriceDisplay, Resolution, Selection, VariantResolver};
pub use view::{ProductView, StockState};
