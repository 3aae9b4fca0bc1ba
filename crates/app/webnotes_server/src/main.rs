//! Webnotes API server binary.
//!
//! Loads configuration from flags and the environment, prepares the store and
//! serves the HTTP API until Ctrl-C.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use webnotes_api::config::ApiConfig;
use webnotes_api::{AppState, router};
use webnotes_core::store::{MemoryStore, PgStore, Store};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "webnotes_server", about = "Webnotes API server", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep everything in memory instead of PostgreSQL. Data is lost on exit.
    #[arg(long, default_value_t = false)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,webnotes_api=debug,webnotes_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    // Refuses to start without a usable signing key.
    let mut config = ApiConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    let store: Arc<dyn Store> = if args.ephemeral {
        warn!("using the in-memory store; nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        info!(
            max_connections = args.max_connections,
            "configuring connection pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        webnotes_core::migrate::migrate(&pool).await?;
        Arc::new(PgStore::new(pool))
    };

    let bind_addr = config.bind_addr.clone();
    let app = router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
