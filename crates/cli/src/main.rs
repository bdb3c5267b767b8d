//! cartsync CLI - a command-line view over the cart/checkout controller.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog
//! cartsync products
//!
//! # Show everything the controller holds
//! cartsync status
//!
//! # Add two units of a product and show the cart
//! cartsync add prod_NqKE50BR4wdgBL -q 2
//!
//! # Capture a checkout from a JSON order draft
//! cartsync checkout chkt_L5z3kmQpdpkGlA --draft order.json
//!
//! # Run against the in-process demo backend
//! cartsync --offline add prod_headphones
//! ```
//!
//! Every run loads the initial state, performs one action and prints the
//! affected part of the snapshot as JSON. The process exits with status 1
//! when the action fails and nothing recovered from it.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cartsync_storefront::commerce::{CommerceClient, CommerceGateway, MemoryCommerce};
use cartsync_storefront::config::CommerceConfig;
use cartsync_storefront::controller::CartController;

mod commands;

#[derive(Parser)]
#[command(name = "cartsync")]
#[command(author, version, about = "Storefront cart and checkout from the command line")]
struct Cli {
    /// Use the in-process demo backend instead of the commerce API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the whole snapshot (products, cart, order, error)
    Status,
    /// List the product catalog
    Products,
    /// Show the current cart
    Cart,
    /// Add a product to the cart
    Add {
        /// Product ID
        product: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a product already in the cart
    Update {
        /// Product ID
        product: String,

        /// New quantity (0 asks the backend to drop the line)
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        product: String,
    },
    /// Remove every item from the cart
    Empty,
    /// Start a fresh cart
    Refresh,
    /// Capture an order for a checkout token
    Checkout {
        /// Checkout token ID
        token: String,

        /// Path to the order draft (JSON)
        #[arg(short, long)]
        draft: PathBuf,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CommerceConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Offline runs need no credentials
    let config = if cli.offline {
        None
    } else {
        match CommerceConfig::from_env() {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Configuration error: {e}");
                std::process::exit(1);
            }
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().and_then(init_sentry);

    // Logs go to stderr so stdout stays valid JSON
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartsync=info,cartsync_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Some(config) => match CommerceClient::new(&config) {
            Ok(client) => run(CartController::new(client), cli.command).await,
            Err(e) => Err(e.into()),
        },
        None => {
            tracing::info!("Using in-process demo backend");
            run(
                CartController::new(MemoryCommerce::with_demo_catalog()),
                cli.command,
            )
            .await
        }
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run<G: CommerceGateway>(
    controller: CartController<G>,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.load_initial_state().await?;

    match command {
        Commands::Status => commands::status::show(&controller)?,
        Commands::Products => commands::catalog::list(&controller)?,
        Commands::Cart => commands::cart::show(&controller)?,
        Commands::Add { product, quantity } => {
            commands::cart::add(&controller, &product, quantity).await?;
        }
        Commands::Update { product, quantity } => {
            commands::cart::update(&controller, &product, quantity).await?;
        }
        Commands::Remove { product } => commands::cart::remove(&controller, &product).await?,
        Commands::Empty => commands::cart::empty(&controller).await?,
        Commands::Refresh => commands::cart::refresh(&controller).await?,
        Commands::Checkout { token, draft } => {
            commands::checkout::capture(&controller, &token, &draft).await?;
        }
    }
    Ok(())
}
