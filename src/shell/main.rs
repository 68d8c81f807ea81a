use anyhow::Context;
use clap::Parser;
use named_counter::shell::config::AppConfig;
use named_counter::shell::{build_state, http};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

/// Named counter service
#[derive(Parser, Debug)]
#[command(name = "named_counter")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "NAMED_COUNTER_CONFIG",
        default_value = "config/named_counter.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let config = AppConfig::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config))?;

    let shutdown = CancellationToken::new();
    let state = build_state(&config, shutdown.clone())
        .await
        .context("failed to open the counter store")?;
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!("Counter endpoint: http://{}/next/{{name}}", config.server.bind);
    tracing::info!("GraphQL endpoint: http://{}/gql", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
    shutdown.cancel();
}
