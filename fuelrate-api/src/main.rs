//! fuelrate-api - FuelRate review and reward service entry point

use anyhow::Result;
use clap::Parser;
use tracing::info;

use fuelrate_api::{build_router, AppState};
use fuelrate_common::auth::load_shared_secret;
use fuelrate_common::config::{self, ServerConfig};
use fuelrate_common::db::init_database;

/// Command-line arguments for fuelrate-api
#[derive(Parser, Debug)]
#[command(name = "fuelrate-api")]
#[command(about = "Review submission and loyalty reward service for FuelRate")]
#[command(version)]
struct Args {
    /// Root folder holding the database (overrides FUELRATE_ROOT and config file)
    #[arg(short, long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting FuelRate API (fuelrate-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref());
    std::fs::create_dir_all(&root_folder)?;

    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    info!("✓ Database initialized");

    let shared_secret = load_shared_secret(&pool).await?;
    if shared_secret == 0 {
        info!("Token verification disabled (shared_secret = 0)");
    } else {
        info!("✓ Loaded token signing secret");
    }

    let server = ServerConfig::from_env()?;
    if server.allow_dev_admin {
        info!("Dev admin token ENABLED - do not use in production");
    }

    let state = AppState::new(pool, shared_secret, server.allow_dev_admin);
    let app = build_router(state);

    let bind = format!("{}:{}", server.bind_addr, server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("fuelrate-api listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
