//! Optika CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show a product with its selectable parameters
//! optika product show acuvue-oasys
//!
//! # Resolve a selection (attributes and values by name, slug or ID)
//! optika product resolve acuvue-oasys --select diopter=-1.25 --select "base curve=8.8"
//!
//! # Add the resolved variant to the cart
//! optika product add acuvue-oasys --select diopter=-1.25 --select "base curve=8.8" -q 2
//!
//! # Cart and favorites
//! optika cart list
//! optika cart update 40:402 3
//! optika favorites toggle 40
//! optika favorites fetch
//! ```
//!
//! Cart and favorites persist under `OPTIKA_STORAGE_DIR` (default `.optika`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use optika_storefront::storage::FileStorage;
use optika_storefront::sync::StorageBus;
use optika_storefront::{AppError, CatalogClient, StorefrontConfig, Tab, telemetry};

mod commands;

use commands::product::SelectArg;

const DEFAULT_LOG_FILTER: &str = "optika_storefront=info,optika_cli=info";

#[derive(Parser)]
#[command(name = "optika")]
#[command(author, version, about = "Optika storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products and pick variants
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Show a product and its parameters
    Show {
        /// Product slug
        slug: String,
    },
    /// Resolve a parameter selection to a variant
    Resolve {
        /// Product slug
        slug: String,

        /// Parameter choice as `attribute=value`; repeatable
        #[arg(short, long = "select")]
        selections: Vec<SelectArg>,
    },
    /// Resolve a selection and add it to the cart
    Add {
        /// Product slug
        slug: String,

        /// Parameter choice as `attribute=value`; repeatable
        #[arg(short, long = "select")]
        selections: Vec<SelectArg>,

        /// How many to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines and totals
    List {
        /// Print the stored JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Set a line's quantity (zero or less removes it)
    Update {
        /// Line key (`product` or `product:variant`)
        key: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Line key (`product` or `product:variant`)
        key: String,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorite product IDs
    List {
        /// Print the stored JSON
        #[arg(long)]
        json: bool,
    },
    /// Add or remove a product
    Toggle {
        /// Product ID
        id: String,
    },
    /// Remove every favorite
    Clear,
    /// Load favorite products from the catalog
    Fetch {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(DEFAULT_LOG_FILTER);
            fail(&AppError::from(e));
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(DEFAULT_LOG_FILTER);

    if let Err(e) = run(cli, &config).await {
        fail(&e);
    }
}

#[allow(clippy::print_stderr)]
fn fail(error: &AppError) -> ! {
    error.report();
    eprintln!("error: {}", error.user_message());
    std::process::exit(1);
}

async fn run(cli: Cli, config: &StorefrontConfig) -> optika_storefront::Result<()> {
    let storage = Arc::new(FileStorage::new(&config.storage_dir));
    let bus = StorageBus::default();
    let tab = Tab::open(storage, &bus);
    tracing::debug!(tab = %tab.id, dir = %config.storage_dir.display(), "Opened storage");

    let result = match cli.command {
        Commands::Product { action } => {
            let client = CatalogClient::new(&config.catalog)?;
            match action {
                ProductAction::Show { slug } => commands::product::show(&client, &slug).await,
                ProductAction::Resolve { slug, selections } => {
                    commands::product::resolve(&client, &slug, &selections).await
                }
                ProductAction::Add {
                    slug,
                    selections,
                    quantity,
                } => commands::product::add(&client, &tab.cart, &slug, &selections, quantity).await,
            }
        }
        Commands::Cart { action } => match action {
            CartAction::List { json } => commands::cart::list(&tab.cart, json),
            CartAction::Update { key, quantity } => {
                commands::cart::update(&tab.cart, &key, quantity)
            }
            CartAction::Remove { key } => commands::cart::remove(&tab.cart, &key),
            CartAction::Clear => commands::cart::clear(&tab.cart),
        },
        Commands::Favorites { action } => match action {
            FavoritesAction::List { json } => commands::favorites::list(&tab.favorites, json),
            FavoritesAction::Toggle { id } => commands::favorites::toggle(&tab.favorites, &id),
            FavoritesAction::Clear => commands::favorites::clear(&tab.favorites),
            FavoritesAction::Fetch { json } => {
                let client = CatalogClient::new(&config.catalog)?;
                commands::favorites::fetch(&client, &tab.favorites, json).await
            }
        },
    };

    // Persist whatever changed, even if the command failed halfway.
    tab.flush().await;
    result
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_repeated_selections() {
        let cli = Cli::try_parse_from([
            "optika", "product", "add", "oasys", "-s", "diopter=-1.25", "--select", "bc=8.8", "-q",
            "2",
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        match cli.command {
            Commands::Product {
                action:
                    ProductAction::Add {
                        slug,
                        selections,
                        quantity,
                    },
            } => {
                assert_eq!(slug, "oasys");
                assert_eq!(selections.len(), 2);
                assert_eq!(quantity, 2);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_cart_update_accepts_negative_quantity() {
        let cli = Cli::try_parse_from(["optika", "cart", "update", "40:402", "-1"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Update { quantity: -1, .. }
            }
        ));
    }
}
