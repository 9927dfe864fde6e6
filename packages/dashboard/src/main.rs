// Main entry point for the dashboard server and CLI

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dashboard::cli::{self, Cli, CliContext, Commands};
use dashboard::server::{build_app, AppState};
use dashboard::Config;
use job_list::PostgresJobStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dashboard=debug,job_list=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve => serve(config).await,
        command => cli::run(command, &CliContext::new(config)).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!("Starting crawl dashboard API");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    PostgresJobStore::migrate(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let ctx = CliContext::new(config.clone());
    let state = AppState {
        stores: Arc::new(PostgresJobStore::from_pool(pool)),
        crawl_service: ctx.crawl_service()?,
        page_size: config.job_list_page_size,
        poll_interval: config.job_list_poll_interval(),
    };
    let app = build_app(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
