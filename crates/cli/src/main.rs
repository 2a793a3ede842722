//! Shopcart CLI - Database tools and a terminal cart client.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! np-cli migrate
//!
//! # Seed the catalog with the demo products
//! np-cli seed products --clear
//!
//! # Browse the catalog
//! np-cli products list --category Electronics --sort price --order asc
//! np-cli products show 507f1f77bcf86cd799439011
//!
//! # Work with the cart of the persisted user
//! np-cli cart add 507f1f77bcf86cd799439011 --quantity 2
//! np-cli cart update <line-id> 3
//! np-cli cart show
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed products` - Seed the catalog from a YAML file
//! - `products` - List and show products through the API
//! - `cart` - Show and change the cart through the API, with an offline copy

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shopcart_client::ProductListQuery;
use shopcart_core::catalog::{SortField, SortOrder};

mod commands;

#[derive(Parser)]
#[command(name = "np-cli")]
#[command(author, version, about = "Shopcart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Seed products from a YAML file
    Products {
        /// Path to the YAML seed file
        #[arg(short, long, default_value = commands::seed::DEFAULT_PRODUCTS_FILE)]
        file: String,

        /// Delete existing products first
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List one page of products
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        category: Option<String>,

        /// Case-insensitive match on name and description
        #[arg(long)]
        search: Option<String>,

        /// `createdAt`, `price`, `name`, `rating` or `stock`
        #[arg(long)]
        sort: Option<SortField>,

        /// `asc` or `desc`
        #[arg(long)]
        order: Option<SortOrder>,
    },
    /// Show one product
    Show {
        /// Product id
        id: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product id
        product_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a line; zero or less removes it
    Update {
        /// Line id, as shown by `cart show`
        line_id: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Line id, as shown by `cart show`
        line_id: String,
    },
    /// Remove every line
    Clear,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, clear } => {
                commands::seed::products(&file, clear).await?;
            }
        },
        Commands::Products { action } => match action {
            ProductAction::List {
                page,
                limit,
                category,
                search,
                sort,
                order,
            } => {
                let query = ProductListQuery {
                    page,
                    limit,
                    category,
                    search,
                    sort,
                    order,
                };
                commands::products::list(&query).await?;
            }
            ProductAction::Show { id } => commands::products::show(&id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show().await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&product_id, quantity).await?,
            CartAction::Update { line_id, quantity } => {
                commands::cart::update(&line_id, quantity).await?;
            }
            CartAction::Remove { line_id } => commands::cart::remove(&line_id).await?,
            CartAction::Clear => commands::cart::clear().await?,
        },
    }
    Ok(())
}
