//! Unified error handling with Sentry integration.
//!
//! Entry points (the CLI, embedding UIs) convert failures into [`AppError`]
//! and call [`AppError::report`] once, at the top, before showing
//! [`AppError::user_message`] to the shopper.

use thiserror::Error;

use crate::catalog::CatalogApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog API operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogApiError),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input from the shopper.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is our fault (or the upstream's) rather than the shopper's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Catalog(CatalogApiError::NotFound(_)) | Self::NotFound(_) | Self::BadRequest(_) => {
                false
            }
            Self::Config(_) | Self::Catalog(_) | Self::Storage(_) | Self::Internal(_) => true,
        }
    }

    /// Log the error and capture server errors to Sentry.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::warn!(error = %self, "Operation rejected");
        }
    }

    /// Message safe to show to the shopper.
    ///
    /// Internal details are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Catalog(CatalogApiError::NotFound(_)) => "Product not found".to_string(),
            Self::Catalog(CatalogApiError::RateLimited(secs)) => {
                format!("Too many requests, try again in {secs} seconds")
            }
            Self::Catalog(_) => "Failed to load catalog data".to_string(),
            Self::Config(err) => err.to_string(),
            Self::Storage(_) | Self::Internal(_) => "Internal error".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("key", "40:402")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb
                .data
                .insert((*key).to_string(), (*value).to_string().into());
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
