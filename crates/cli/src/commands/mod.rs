//! Command implementations.
//!
//! Each command renders its output to a `String` first so the rendering can be
//! tested without a terminal.

pub mod cart;
pub mod favorites;
pub mod product;

use optika_storefront::AppError;
use serde::Serialize;

/// Print a command's output.
#[allow(clippy::print_stdout)]
pub fn emit(output: &str) {
    println!("{output}");
}

/// Pretty JSON, for `--json` output.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Internal(e.to_string()))
}
