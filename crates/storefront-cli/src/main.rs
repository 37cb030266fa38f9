//! Storefront CLI - browse the ingredients catalog and manage products
//! from the terminal.
//!
//! Public commands (`shop`, `product`) work anonymously. Admin commands go
//! through the session gate first and fall back to the login prompt.

mod app;

use std::io;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use storefront_core::catalog::{CatalogFilter, CategoryFilter};
use storefront_core::models::{Category, Product, ProductDraft, ProductPatch};
use storefront_core::routes::{self, ADMIN_ROUTE};
use storefront_core::utils::{format_price, truncate_string};
use storefront_core::Verdict;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Column width for product names in listings
const NAME_COLUMN_WIDTH: usize = 32;

#[derive(Parser)]
#[command(name = "storefront", version, about = "Ingredients storefront catalog and admin")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List active products, optionally searching and filtering
    Shop {
        /// Match against product name or description
        #[arg(short, long, default_value = "")]
        search: String,
        /// all, flour, sugar, salt or other
        #[arg(short, long, default_value = "all", value_parser = parse_category_filter)]
        category: CategoryFilter,
    },
    /// Show a single active product
    Product { id: i64 },
    /// Log in to the admin area
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Report whether the stored session would be admitted
    Status,
    /// Manage products (requires login)
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List all products, including inactive ones
    List,
    Show { id: i64 },
    Create(CreateArgs),
    Update {
        id: i64,
        #[command(flatten)]
        fields: UpdateArgs,
    },
    /// Soft-delete a product (marks it inactive)
    Delete { id: i64 },
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = parse_category)]
    category: Category,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    quantity: u32,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    rating: Option<f64>,
    /// Create the product hidden from the public catalog
    #[arg(long)]
    inactive: bool,
}

#[derive(Args)]
struct UpdateArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    quantity: Option<u32>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    rating: Option<f64>,
    #[arg(long)]
    active: Option<bool>,
}

impl From<CreateArgs> for ProductDraft {
    fn from(args: CreateArgs) -> Self {
        let mut draft = ProductDraft::new(&args.name, args.category, args.price, args.quantity);
        draft.description = args.description;
        if let Some(rating) = args.rating {
            draft.rating = rating;
        }
        draft.is_active = !args.inactive;
        draft
    }
}

impl From<UpdateArgs> for ProductPatch {
    fn from(args: UpdateArgs) -> Self {
        ProductPatch {
            name: args.name,
            category: args.category,
            description: args.description,
            price: args.price,
            quantity_available: args.quantity,
            rating: args.rating,
            is_active: args.active,
        }
    }
}

fn parse_category(s: &str) -> Result<Category, String> {
    Category::parse(s).ok_or_else(|| format!("unknown category '{}'", s))
}

fn parse_category_filter(s: &str) -> Result<CategoryFilter, String> {
    CategoryFilter::parse(s).ok_or_else(|| format!("unknown category '{}'", s))
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing();
    info!("Storefront starting");

    let mut app = App::new()?;

    match cli.command {
        Command::Shop { search, category } => shop(&app, &search, category).await,
        Command::Product { id } => {
            let product = app.api.fetch_product(id).await?;
            print_product(&product);
            Ok(())
        }
        Command::Login { username } => {
            if !app.show_login(username).await? {
                bail!("Login failed");
            }
            Ok(())
        }
        Command::Logout => {
            app.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Status => {
            let (logged_in, verdict) = app.session_status().await;
            match verdict {
                Verdict::Granted => println!("Session active."),
                _ if logged_in => println!("Session expired. Please log in again."),
                _ => println!("Not logged in."),
            }
            Ok(())
        }
        Command::Admin { command } => admin(&mut app, command).await,
    }
}

async fn shop(app: &App, search: &str, category: CategoryFilter) -> Result<()> {
    let products = app.api.fetch_products().await?;
    let filter = CatalogFilter::new(search, category);
    let matches = filter.apply(&products);

    if matches.is_empty() {
        println!("No products found. Try adjusting your search or filter criteria.");
        return Ok(());
    }
    for product in matches {
        print_row(product);
    }
    Ok(())
}

async fn admin(app: &mut App, command: AdminCommand) -> Result<()> {
    let route = match &command {
        AdminCommand::Show { id } | AdminCommand::Update { id, .. } => routes::admin_product_route(*id),
        _ => ADMIN_ROUTE.to_string(),
    };
    if !app.navigate(&route).await? {
        bail!("Not authorized");
    }

    match command {
        AdminCommand::List => {
            for product in app.api.fetch_admin_products().await? {
                print_row(&product);
            }
        }
        AdminCommand::Show { id } => print_product(&app.api.fetch_admin_product(id).await?),
        AdminCommand::Create(args) => {
            let created = app.api.create_product(&args.into()).await?;
            println!("Product created successfully");
            print_row(&created);
        }
        AdminCommand::Update { id, fields } => {
            let updated = app.api.update_product(id, &fields.into()).await?;
            println!("Product updated successfully");
            print_row(&updated);
        }
        AdminCommand::Delete { id } => {
            app.api.delete_product(id).await?;
            println!("Product soft-deleted successfully");
        }
    }
    Ok(())
}

fn print_row(product: &Product) {
    let status = if !product.is_active {
        "inactive"
    } else if product.is_in_stock() {
        "in stock"
    } else {
        "out of stock"
    };
    println!(
        "{:>5}  {:<width$}  {:<6}  {:>14}  {:>6}  {}",
        product.id,
        truncate_string(&product.name, NAME_COLUMN_WIDTH),
        product.category.as_str(),
        format_price(product.price),
        product.quantity_available,
        status,
        width = NAME_COLUMN_WIDTH,
    );
}

fn print_product(product: &Product) {
    println!("{}", product.name);
    println!("  Category:  {}", product.category.display_name());
    println!("  Price:     {}", format_price(product.price));
    println!("  Available: {}", product.quantity_available);
    println!("  Rating:    {:.1}", product.rating);
    if let Some(ref description) = product.description {
        println!();
        println!("{}", description);
    }
}
