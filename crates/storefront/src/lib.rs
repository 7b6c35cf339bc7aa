//! Optika Storefront - client runtime for the storefront.
//!
//! Wraps the pure domain logic from `optika-core` with everything that talks
//! to the outside world.
//!
//! # Architecture
//!
//! - [`storage`] - Key-value persistence slots (in-memory and file-backed)
//! - [`sync`] - Cross-tab change notifications over a broadcast bus
//! - [`store`] - Cart and favorites stores that persist every mutation and
//!   apply changes made by other tabs
//! - [`catalog`] - HTTP client for the upstream catalog API, with an
//!   in-memory `moka` cache (5 minute TTL)
//! - [`config`] / [`error`] / [`telemetry`] - Environment configuration,
//!   unified error type, tracing and Sentry setup
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use optika_storefront::{storage::FileStorage, store::Tab, sync::StorageBus};
//!
//! let storage = Arc::new(FileStorage::new(".optika"));
//! let bus = StorageBus::default();
//! let tab = Tab::open(storage, &bus);
//!
//! tab.favorites.toggle_favorite(42.into());
//! tab.flush().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod storage;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use catalog::{CatalogApiError, CatalogClient};
pub use config::{CatalogConfig, ConfigError, StorefrontConfig};
pub use error::{AppError, Result};
pub use store::{CartStore, FavoritesStore, Tab};
