//! Bazaar server binary.

use anyhow::{Context, Result};
use bazaar_core::config::AppConfig;
use bazaar_server::catalog::{Catalog, seed_products_from_file};
use bazaar_server::{AppState, create_router};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bazaar - an online-shop backend
#[derive(Parser, Debug)]
#[command(name = "bazaard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "BAZAAR_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup banner
    tracing::info!("Bazaar v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. The file is optional: defaults plus BAZAAR_ env
    // vars are enough for a dev setup.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("BAZAAR_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize the datastore
    let store = bazaar_store::from_config(&config.db)
        .await
        .context("failed to initialize datastore")?;
    store
        .health_check()
        .await
        .context("datastore health check failed")?;
    tracing::info!(path = %config.db.path.display(), "Datastore initialized");

    // Seed the catalog when configured and the products table is empty
    if let Some(seed_path) = &config.catalog.seed_path {
        let existing = store
            .count_products()
            .await
            .context("failed to count products")?;
        if existing == 0 {
            let inserted = seed_products_from_file(store.as_ref(), seed_path).await?;
            tracing::info!(
                seed_path = %seed_path.display(),
                inserted,
                "Seeded product catalog"
            );
        } else {
            tracing::debug!(existing, "Products already present, skipping seed");
        }
    }

    // Build the in-memory catalog snapshot. A failed load is tolerated: the
    // shop still serves carts, and /health reports the error.
    let catalog = Arc::new(Catalog::empty());
    match catalog
        .reload(store.as_ref(), config.catalog.image_base_url.as_deref())
        .await
    {
        Ok(count) => tracing::info!(products = count, "Catalog snapshot loaded"),
        Err(e) => tracing::warn!(error = %e, "Catalog load failed, starting with empty catalog"),
    }

    // Create application state and router
    let bind = config.server.bind.clone();
    let state = AppState::new(config, store, catalog);
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
