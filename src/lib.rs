pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod geo;
pub mod models;
pub mod services;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use db::repositories::admin::hash_password;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("Wrote config.toml");
            } else {
                println!("config.toml already exists, leaving it alone");
            }
            Ok(())
        }
        Some(Commands::HashPassword { password }) => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
        Some(Commands::Serve) | None => run_server(config).await,
    }
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    info!("Callboard v{} starting...", env!("CARGO_PKG_VERSION"));

    let state = api::create_app_state(config).await?;
    let app = api::router(state.clone());

    let addr = format!(
        "{}:{}",
        state.config.server.bind_address, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => tracing::error!("Error listening for shutdown: {}", e),
    }
}
