//! Core types for Optika.
//!
//! This module provides type-safe wrappers and the catalog data model.

pub mod catalog;
pub mod id;
pub mod price;

pub use catalog::*;
pub use id::*;
pub use price::Price;
