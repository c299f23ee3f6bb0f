//! Storefront CLI - browse the catalog, sign in, keep a cart and place orders
//! against the storefront backend.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_core::cart::{Cart, CartCache};
use storefront_core::config::normalize_base_url;
use storefront_core::models::{
    Credentials, NewProduct, Order, OrderStatus, Product, ProductUpdate, Registration,
};
use storefront_core::utils::{format_date, format_price, truncate_string};
use storefront_core::{
    ApiError, AuthSessionManager, Config, Navigation, Navigator, Router, TokenStore,
};

/// Read instead of prompting when set
const PASSWORD_ENV: &str = "STOREFRONT_PASSWORD";

/// Column width for product names in listings
const NAME_WIDTH: usize = 32;

#[derive(Parser)]
#[command(name = "storefront", version, about = "Storefront command line client")]
struct Cli {
    /// Backend API root, e.g. http://localhost:8000/api/
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in
    Login {
        #[arg(long)]
        username: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user's profile
    Whoami,
    /// Show session state
    Status,
    /// Navigate to a route through the access guard
    Open { path: String },
    /// List categories
    Categories,
    /// List products
    Products {
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one product
    Product { id: i64 },
    /// Manage the local cart
    #[command(subcommand)]
    Cart(CartCommand),
    /// Place an order for the cart contents
    Checkout,
    /// List your orders
    Orders,
    /// Order and catalog administration (admins only)
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand)]
enum CartCommand {
    Show,
    Add { id: i64 },
    Remove { id: i64 },
    Set { id: i64, quantity: u32 },
    Clear,
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Look up an order by code
    Order { code: String },
    /// Change an order's status
    SetStatus {
        code: String,
        status: String,
        /// Required when cancelling
        #[arg(long)]
        reason: Option<String>,
    },
    /// Create a category
    AddCategory { name: String },
    /// Rename a category
    RenameCategory { id: i64, name: String },
    /// Delete a category and its products
    DeleteCategory { id: i64 },
    /// Create a product
    AddProduct {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: i64,
        #[arg(long)]
        article: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        specifications: Option<String>,
    },
    /// Change product fields; only the given flags are sent
    EditProduct {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        article: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        specifications: Option<String>,
    },
    /// Delete a product
    DeleteProduct { id: i64 },
    /// Remove a product's main image
    DeleteProductImage { id: i64 },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level, e.g. RUST_LOG=storefront_core=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(ref url) = cli.api_url {
        config.api_base_url = normalize_base_url(url);
    }
    info!(api = %config.api_base_url, "Storefront CLI starting");

    let storage = config.open_storage()?;
    let router = Arc::new(Router::new());
    let manager = AuthSessionManager::new(config.clone(), TokenStore::new(storage), router.clone())?;
    let cart_cache = CartCache::new(config.data_dir()?);

    let result = run(cli.command, &manager, &router, &cart_cache, config).await;

    if let Some(message) = manager.logout_message() {
        eprintln!("{}", message);
        manager.clear_logout_message();
    }

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_lost) {
            eprintln!("Run `storefront login` to sign in again.");
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    command: Command,
    manager: &AuthSessionManager,
    router: &Router,
    cart_cache: &CartCache,
    mut config: Config,
) -> Result<()> {
    match command {
        Command::Login { username } => {
            let username = match username.or_else(|| config.last_username.clone()) {
                Some(u) => u,
                None => prompt("Username: ")?,
            };
            let password = read_password()?;
            manager.login(&Credentials::new(username.clone(), password)).await?;

            config.last_username = Some(username);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            print_welcome(manager);
        }
        Command::Register { username, email, phone } => {
            let password = read_password()?;
            let registration = Registration { username, password, email, phone };
            manager.register(&registration).await?;
            print_welcome(manager);
        }
        Command::Logout => {
            // Always clear: a half-written session still leaves keys behind
            let was_signed_in = manager.is_authenticated();
            manager.logout(None).await;
            if was_signed_in {
                println!("Signed out.");
            } else {
                println!("Not signed in; cleared local session data.");
            }
        }
        Command::Whoami => {
            if !manager.is_authenticated() {
                println!("Not signed in.");
                return Ok(());
            }
            manager.fetch_user_data().await;
            match manager.current_user() {
                Some(user) => {
                    println!("{}", user.username);
                    if let Some(email) = user.email {
                        println!("  email: {}", email);
                    }
                    if let Some(phone) = user.phone {
                        println!("  phone: {}", phone);
                    }
                    println!("  role:  {}", user.role_display.or(user.role).unwrap_or_default());
                    if !user.orders.is_empty() {
                        println!("  orders: {}", user.orders.len());
                    }
                }
                None => println!("Signed in, profile not loaded."),
            }
        }
        Command::Status => {
            let session = manager.session();
            println!("API:           {}", manager.config().api_base_url);
            println!("Authenticated: {}", session.is_authenticated());
            if let Some(role) = session.role {
                println!("Role:          {}", role);
            }
            println!("Route:         {}", router.current_path());
        }
        Command::Open { path } => match manager.navigate(&path) {
            Navigation::Allowed { path } => println!("{}", path),
            Navigation::Redirected { requested, path } => {
                println!("{} -> {}", requested, path)
            }
            Navigation::NotFound { path } => bail!("No page at {}", path),
        },
        Command::Categories => {
            for category in manager.client().categories().await? {
                println!("{:>4}  {}", category.id, category.name);
            }
        }
        Command::Products { category, search } => {
            let client = manager.client();
            let mut products = match category {
                Some(id) => client.products_in_category(id).await?,
                None => client.products().await?,
            };
            if let Some(ref query) = search {
                products.retain(|p| p.matches(query));
            }
            if products.is_empty() {
                println!("No products found.");
            }
            for product in &products {
                print_product_line(product);
            }
        }
        Command::Product { id } => {
            let product = manager.client().product(id).await?;
            println!("{} ({})", product.name, product.article);
            if let Some(ref category) = product.category {
                println!("  category: {}", category.name);
            }
            println!("  price:    {}", format_price(product.price));
            if let Some(ref description) = product.description {
                println!();
                println!("{}", description);
            }
            if let Some(ref specifications) = product.specifications {
                println!();
                println!("{}", specifications);
            }
        }
        Command::Cart(cmd) => cart_command(cmd, manager, cart_cache).await?,
        Command::Checkout => {
            let client = manager.authenticated_client().context("Sign in to place an order")?;
            let mut cart = cart_cache.load_or_default();
            if cart.is_empty() {
                bail!("Your cart is empty");
            }
            let removed = client.refresh_prices(&mut cart).await?;
            if !removed.is_empty() {
                println!("Removed unavailable products: {:?}", removed);
            }
            let order = client.create_order(&cart.to_order()).await?;
            cart_cache.clear()?;
            println!("Order {} placed, total {}", order.code, format_price(order.total_price));
        }
        Command::Orders => {
            let client = manager.authenticated_client().context("Sign in to see your orders")?;
            let orders = client.orders().await?;
            if orders.is_empty() {
                println!("No orders yet.");
            }
            for order in &orders {
                print_order_line(order);
            }
        }
        Command::Admin(cmd) => {
            if !manager.is_admin() {
                bail!("Administrator access required");
            }
            let client = manager.authenticated_client()?;
            match cmd {
                AdminCommand::Order { code } => {
                    let order = client.order_by_code(&code).await?;
                    print_order_details(&order);
                }
                AdminCommand::SetStatus { code, status, reason } => {
                    let status: OrderStatus = status.parse().map_err(|e: String| anyhow!(e))?;
                    let order = client
                        .update_order_status(&code, status, reason.as_deref())
                        .await?;
                    print_order_line(&order);
                }
                AdminCommand::AddCategory { name } => {
                    let category = client.create_category(&name).await?;
                    println!("Created category {} ({})", category.name, category.id);
                }
                AdminCommand::RenameCategory { id, name } => {
                    let category = client.update_category(id, &name).await?;
                    println!("Category {} is now {}", category.id, category.name);
                }
                AdminCommand::DeleteCategory { id } => {
                    client.delete_category(id).await?;
                    println!("Deleted category {}", id);
                }
                AdminCommand::AddProduct {
                    name,
                    category,
                    article,
                    price,
                    description,
                    specifications,
                } => {
                    let product = NewProduct {
                        name,
                        category_id: category,
                        article,
                        price,
                        specifications,
                        description,
                    };
                    let created = client.create_product(&product).await?;
                    print_product_line(&created);
                }
                AdminCommand::EditProduct {
                    id,
                    name,
                    category,
                    article,
                    price,
                    description,
                    specifications,
                } => {
                    let update = ProductUpdate {
                        name,
                        category_id: category,
                        article,
                        price,
                        specifications,
                        description,
                    };
                    let product = client.update_product(id, &update).await?;
                    print_product_line(&product);
                }
                AdminCommand::DeleteProduct { id } => {
                    client.delete_product(id).await?;
                    println!("Deleted product {}", id);
                }
                AdminCommand::DeleteProductImage { id } => {
                    client.delete_product_image(id).await?;
                    println!("Removed image of product {}", id);
                }
            }
        }
    }
    Ok(())
}

async fn cart_command(cmd: CartCommand, manager: &AuthSessionManager, cart_cache: &CartCache) -> Result<()> {
    let mut cart = cart_cache.load_or_default();
    match cmd {
        CartCommand::Show => {
            if cart.is_empty() {
                println!("Your cart is empty.");
                return Ok(());
            }
            let saved_age = cart_cache.load().ok().flatten().map(|saved| saved.age_display());
            match manager.client().refresh_prices(&mut cart).await {
                Ok(removed) => {
                    if !removed.is_empty() {
                        println!("Removed unavailable products: {:?}", removed);
                    }
                    cart_cache.save(&cart)?;
                }
                Err(e) => warn!(error = %e, "Could not refresh cart prices"),
            }
            print_cart(&cart);
            if let Some(age) = saved_age {
                println!("Saved {}", age);
            }
        }
        CartCommand::Add { id } => {
            let product = manager.client().product(id).await?;
            cart.add_item(&product);
            cart_cache.save(&cart)?;
            println!("Added {}. {} item(s) in cart.", product.name, cart.item_count());
        }
        CartCommand::Remove { id } => {
            cart.remove_item(id);
            cart_cache.save(&cart)?;
            print_cart(&cart);
        }
        CartCommand::Set { id, quantity } => {
            if !cart.items.iter().any(|i| i.product_id == id) {
                bail!("Product {} is not in your cart", id);
            }
            cart.update_quantity(id, quantity);
            cart_cache.save(&cart)?;
            print_cart(&cart);
        }
        CartCommand::Clear => {
            cart_cache.clear()?;
            println!("Cart cleared.");
        }
    }
    Ok(())
}

fn print_welcome(manager: &AuthSessionManager) {
    match manager.current_user() {
        Some(user) => println!("Signed in as {}.", user.username),
        None => println!("Signed in."),
    }
}

fn print_product_line(product: &Product) {
    println!(
        "{:>4}  {:<width$}  {:>12}",
        product.id,
        truncate_string(&product.name, NAME_WIDTH),
        format_price(product.price),
        width = NAME_WIDTH
    );
}

fn print_cart(cart: &Cart) {
    for item in &cart.items {
        println!(
            "{:>4}  {:<width$}  {:>3} x {:>10} = {:>12}",
            item.product_id,
            truncate_string(&item.name, NAME_WIDTH),
            item.quantity,
            format_price(item.price),
            format_price(item.line_total()),
            width = NAME_WIDTH
        );
    }
    println!("Total: {} ({} item(s))", format_price(cart.total_price()), cart.item_count());
}

fn print_order_line(order: &Order) {
    println!(
        "{}  {}  {:<10}  {:>12}",
        order.code,
        format_date(&order.created_at),
        order.status,
        format_price(order.total_price)
    );
}

fn print_order_details(order: &Order) {
    print_order_line(order);
    if let Some(ref owner) = order.user {
        println!("  customer: {}", owner.username);
    }
    for item in &order.items {
        println!(
            "  {:<width$}  {:>3} x {:>10}",
            truncate_string(&item.product.name, NAME_WIDTH),
            item.quantity,
            format_price(item.price),
            width = NAME_WIDTH
        );
    }
    if let Some(ref reason) = order.cancel_reason {
        println!("  cancelled: {}", reason);
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("{} cannot be empty", label.trim_end_matches(": "));
    }
    Ok(value)
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}
